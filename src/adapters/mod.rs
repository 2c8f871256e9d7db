//! Concrete adapter implementations for ports.

pub mod csv_portfolio_adapter;
pub mod file_settings_adapter;
pub mod text_report_adapter;
pub mod yaml_rules_adapter;
