//! Read-through view of the broker's open positions.
//!
//! The tracker keeps no ledger. Orders are forwarded to the broker and
//! every P/L figure is queried fresh; fills only become visible once the
//! broker reports them.

use crate::domain::error::TradewindError;
use crate::domain::position::{OrderRequest, Side};
use crate::domain::tick::Quote;
use crate::ports::broker_port::BrokerPort;
use std::sync::Arc;
use tracing::{info, warn};

/// Fixed order parameters sent with every request.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDefaults {
    pub deviation: u32,
    pub magic: u64,
    pub comment: String,
}

impl Default for OrderDefaults {
    fn default() -> Self {
        Self {
            deviation: 10,
            magic: 234_000,
            comment: "tradewind".to_string(),
        }
    }
}

/// Outcome of closing every position on a symbol. Each close is
/// attempted regardless of earlier failures.
#[derive(Debug, Default)]
pub struct CloseReport {
    pub closed: Vec<u64>,
    pub failed: Vec<(u64, TradewindError)>,
}

impl CloseReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct PositionTracker {
    broker: Arc<dyn BrokerPort>,
    defaults: OrderDefaults,
}

impl PositionTracker {
    pub fn new(broker: Arc<dyn BrokerPort>, defaults: OrderDefaults) -> Self {
        Self { broker, defaults }
    }

    pub fn defaults(&self) -> &OrderDefaults {
        &self.defaults
    }

    /// Send a market order priced off `quote` (ask for Buy, bid for Sell).
    pub fn place(
        &self,
        symbol: &str,
        side: Side,
        volume: f64,
        quote: &Quote,
    ) -> Result<u64, TradewindError> {
        if volume.is_nan() || volume <= 0.0 {
            return Err(TradewindError::OrderFailed {
                reason: format!("volume must be positive, got {volume}"),
            });
        }
        let order = OrderRequest {
            symbol: symbol.to_string(),
            side,
            volume,
            price: side.entry_price(quote),
            deviation: self.defaults.deviation,
            magic: self.defaults.magic,
            comment: self.defaults.comment.clone(),
        };
        match self.broker.submit_order(&order) {
            Ok(ticket) => {
                info!(symbol, %side, volume, price = order.price, ticket, "order placed");
                Ok(ticket)
            }
            Err(e) => {
                warn!(symbol, %side, volume, "order rejected: {e}");
                Err(TradewindError::OrderFailed {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Close every open position on `symbol` at the opposing quote.
    /// Fails only if the positions cannot be listed.
    pub fn close_all(&self, symbol: &str, quote: &Quote) -> Result<CloseReport, TradewindError> {
        let positions = self.broker.list_open_positions(symbol)?;
        let mut report = CloseReport::default();
        for pos in positions.iter().filter(|p| p.symbol == symbol) {
            let price = pos.close_price(quote);
            match self
                .broker
                .close_position(pos.ticket, pos.volume, price, self.defaults.deviation)
            {
                Ok(()) => {
                    info!(ticket = pos.ticket, price, "position closed");
                    report.closed.push(pos.ticket);
                }
                Err(e) => {
                    warn!(ticket = pos.ticket, "close failed: {e}");
                    report.failed.push((
                        pos.ticket,
                        TradewindError::OrderFailed {
                            reason: e.to_string(),
                        },
                    ));
                }
            }
        }
        Ok(report)
    }

    /// Sum of `profit` over the open positions on `symbol`, queried now.
    pub fn aggregate_pl(&self, symbol: &str) -> Result<f64, TradewindError> {
        let positions = self.broker.list_open_positions(symbol)?;
        Ok(positions
            .iter()
            .filter(|p| p.symbol == symbol)
            .map(|p| p.profit)
            .sum())
    }
}
