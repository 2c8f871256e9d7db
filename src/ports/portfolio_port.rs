//! Portfolio snapshot source port.

use crate::domain::error::PretradeError;
use crate::domain::portfolio::PortfolioSnapshot;

pub trait PortfolioPort {
    fn load_portfolio(&self) -> Result<PortfolioSnapshot, PretradeError>;
}
