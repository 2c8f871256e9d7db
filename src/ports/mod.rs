//! Port traits implemented by the adapters.

pub mod portfolio_port;
pub mod report_port;
pub mod rules_port;
pub mod settings_port;
