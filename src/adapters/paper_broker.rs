//! In-memory broker for running the dashboard without a live venue.
//!
//! Orders fill immediately at the requested price. Open positions are
//! marked to the feed's latest quote whenever they are listed.

use crate::domain::error::TradewindError;
use crate::domain::position::{OrderRequest, Position, Side};
use crate::domain::tick::Quote;
use crate::ports::broker_port::BrokerPort;
use crate::ports::feed_port::FeedPort;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

#[derive(Debug, Default)]
struct Book {
    next_ticket: u64,
    open: Vec<Position>,
    realized: f64,
}

pub struct PaperBroker {
    feed: Arc<dyn FeedPort>,
    contract_size: f64,
    book: Mutex<Book>,
}

impl PaperBroker {
    pub fn new(feed: Arc<dyn FeedPort>, contract_size: f64) -> Self {
        Self {
            feed,
            contract_size,
            book: Mutex::new(Book {
                next_ticket: 1,
                ..Book::default()
            }),
        }
    }

    fn book(&self) -> Result<MutexGuard<'_, Book>, TradewindError> {
        self.book.lock().map_err(|_| TradewindError::BrokerUnavailable {
            reason: "paper book lock poisoned".into(),
        })
    }

    /// Profit booked by closes so far.
    pub fn realized_pl(&self) -> Result<f64, TradewindError> {
        Ok(self.book()?.realized)
    }

    fn profit(&self, side: Side, open_price: f64, exit_price: f64, volume: f64) -> f64 {
        let per_unit = match side {
            Side::Buy => exit_price - open_price,
            Side::Sell => open_price - exit_price,
        };
        per_unit * volume * self.contract_size
    }

    fn mark(&self, position: &mut Position, quote: &Quote) {
        let exit = position.close_price(quote);
        position.profit = self.profit(position.side, position.open_price, exit, position.volume);
    }
}

impl BrokerPort for PaperBroker {
    fn list_open_positions(&self, symbol: &str) -> Result<Vec<Position>, TradewindError> {
        let quote = self
            .feed
            .fetch_latest_tick(symbol)
            .map_err(|e| TradewindError::BrokerUnavailable {
                reason: format!("cannot mark positions: {e}"),
            })?
            .map(|t| t.quote());

        let mut book = self.book()?;
        let mut positions = Vec::new();
        for pos in book.open.iter_mut().filter(|p| p.symbol == symbol) {
            // Without a fresh quote the previous mark stands.
            if let Some(quote) = &quote {
                self.mark(pos, quote);
            }
            positions.push(pos.clone());
        }
        Ok(positions)
    }

    fn submit_order(&self, order: &OrderRequest) -> Result<u64, TradewindError> {
        if !order.price.is_finite() || order.price <= 0.0 {
            return Err(TradewindError::OrderFailed {
                reason: format!("invalid price {}", order.price),
            });
        }
        let mut book = self.book()?;
        let ticket = book.next_ticket;
        book.next_ticket += 1;
        book.open.push(Position {
            ticket,
            symbol: order.symbol.clone(),
            side: order.side,
            volume: order.volume,
            open_price: order.price,
            profit: 0.0,
        });
        info!(
            ticket,
            symbol = %order.symbol,
            side = %order.side,
            volume = order.volume,
            price = order.price,
            magic = order.magic,
            "paper fill"
        );
        Ok(ticket)
    }

    fn close_position(
        &self,
        ticket: u64,
        volume: f64,
        price: f64,
        deviation: u32,
    ) -> Result<(), TradewindError> {
        let mut book = self.book()?;
        let index = book
            .open
            .iter()
            .position(|p| p.ticket == ticket)
            .ok_or_else(|| TradewindError::OrderFailed {
                reason: format!("no open position with ticket {ticket}"),
            })?;

        let open = &book.open[index];
        if volume <= 0.0 || volume > open.volume + f64::EPSILON {
            return Err(TradewindError::OrderFailed {
                reason: format!(
                    "cannot close {volume} of ticket {ticket} holding {}",
                    open.volume
                ),
            });
        }

        let gained = self.profit(open.side, open.open_price, price, volume);
        let remaining = open.volume - volume;
        book.realized += gained;
        if remaining <= f64::EPSILON {
            book.open.remove(index);
        } else {
            book.open[index].volume = remaining;
        }
        debug!(ticket, volume, price, deviation, gained, "paper close");
        Ok(())
    }
}
