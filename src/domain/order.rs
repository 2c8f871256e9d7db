//! Simulated order value object.
//!
//! Quantity and price are always non-negative; direction lives in [`Side`].

use crate::domain::error::PretradeError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// +1.0 for buys, -1.0 for sells.
    pub fn sign(self) -> f64 {
        match self {
            Side::Buy => 1.0,
            Side::Sell => -1.0,
        }
    }
}

impl FromStr for Side {
    type Err = PretradeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" | "compra" => Ok(Side::Buy),
            "sell" | "venda" => Ok(Side::Sell),
            other => Err(PretradeError::InvalidOrder {
                reason: format!("side must be 'buy' or 'sell', got '{other}'"),
            }),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub fund: String,
    pub instrument: String,
    pub quantity: f64,
    pub price: f64,
    pub side: Side,
}

impl Order {
    pub fn new(
        fund: &str,
        instrument: &str,
        quantity: f64,
        price: f64,
        side: Side,
    ) -> Result<Self, PretradeError> {
        if !quantity.is_finite() || !price.is_finite() {
            return Err(PretradeError::InvalidOrder {
                reason: format!("quantity/price must be finite numbers ({quantity}, {price})"),
            });
        }
        if quantity < 0.0 || price < 0.0 {
            return Err(PretradeError::InvalidOrder {
                reason: "quantity and price must be non-negative".to_string(),
            });
        }
        Ok(Order {
            fund: fund.trim().to_string(),
            instrument: instrument.trim().to_string(),
            quantity,
            price,
            side,
        })
    }

    /// Build an order from raw text fields, as typed by a user or read from a file.
    pub fn parse(
        fund: &str,
        instrument: &str,
        quantity: &str,
        price: &str,
        side: &str,
    ) -> Result<Self, PretradeError> {
        let side: Side = side.parse()?;
        let quantity = parse_number(quantity, "quantity")?;
        let price = parse_number(price, "price")?;
        Order::new(fund, instrument, quantity, price, side)
    }

    /// Gross value, always non-negative.
    pub fn value(&self) -> f64 {
        self.quantity * self.price
    }

    /// Value with the side's sign applied.
    pub fn signed_value(&self) -> f64 {
        self.side.sign() * self.value()
    }

    /// Zero-quantity order on the same instrument; used as evaluation context
    /// once a batch is already reflected in the snapshot.
    pub fn as_context(&self) -> Order {
        Order {
            fund: self.fund.clone(),
            instrument: self.instrument.clone(),
            quantity: 0.0,
            price: 0.0,
            side: Side::Buy,
        }
    }
}

fn parse_number(raw: &str, field: &str) -> Result<f64, PretradeError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|e| PretradeError::InvalidOrder {
            reason: format!("invalid {field} '{}': {e}", raw.trim()),
        })
}
