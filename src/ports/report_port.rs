//! Report generation port.

use crate::domain::batch::BatchReport;
use crate::domain::error::PretradeError;
use std::path::Path;

pub trait ReportPort {
    fn render(&self, report: &BatchReport) -> String;

    fn write(&self, report: &BatchReport, output_path: &Path) -> Result<(), PretradeError> {
        std::fs::write(output_path, self.render(report)).map_err(|e| PretradeError::Report {
            reason: format!("cannot write {}: {e}", output_path.display()),
        })
    }
}
