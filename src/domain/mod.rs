//! Core domain types and logic.

pub mod batch;
pub mod error;
pub mod limits;
pub mod maturity;
pub mod order;
pub mod portfolio;
pub mod rule_result;
pub mod rules;
pub mod runner;
pub mod settings_validation;
pub mod simulator;
pub mod target;
pub mod target_parser;
