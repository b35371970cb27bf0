//! Broker port. The broker is the only source of truth for positions.

use crate::domain::error::TradewindError;
use crate::domain::position::{OrderRequest, Position};

pub trait BrokerPort: Send + Sync {
    fn list_open_positions(&self, symbol: &str) -> Result<Vec<Position>, TradewindError>;

    /// Submit a market order; returns the broker's ticket on a fill.
    fn submit_order(&self, order: &OrderRequest) -> Result<u64, TradewindError>;

    /// Close `volume` of position `ticket` at `price`, accepting up to
    /// `deviation` points of slippage.
    fn close_position(
        &self,
        ticket: u64,
        volume: f64,
        price: f64,
        deviation: u32,
    ) -> Result<(), TradewindError>;
}
