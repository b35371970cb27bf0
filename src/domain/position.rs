//! Order sides, broker-reported positions, and order requests.

use crate::domain::tick::Quote;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Price an order on this side fills at: ask for Buy, bid for Sell.
    pub fn entry_price(&self, quote: &Quote) -> f64 {
        match self {
            Side::Buy => quote.ask,
            Side::Sell => quote.bid,
        }
    }

    /// Price a position on this side closes at: bid for Buy, ask for Sell.
    pub fn exit_price(&self, quote: &Quote) -> f64 {
        match self {
            Side::Buy => quote.bid,
            Side::Sell => quote.ask,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" | "long" => Ok(Side::Buy),
            "sell" | "short" => Ok(Side::Sell),
            other => Err(format!("unknown side '{other}'")),
        }
    }
}

/// An open position as the broker reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub ticket: u64,
    pub symbol: String,
    pub side: Side,
    pub volume: f64,
    pub open_price: f64,
    pub profit: f64,
}

impl Position {
    /// Price this position would close at under `quote`.
    pub fn close_price(&self, quote: &Quote) -> f64 {
        self.side.exit_price(quote)
    }
}

/// Market order as handed to the broker.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    pub volume: f64,
    pub price: f64,
    /// Accepted slippage in points.
    pub deviation: u32,
    pub magic: u64,
    pub comment: String,
}
