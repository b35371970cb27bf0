//! Market-data feed port.

use crate::domain::error::TradewindError;
use crate::domain::ohlcv::Bar;
use crate::domain::tick::Tick;
use crate::domain::timeframe::Timeframe;

pub trait FeedPort: Send + Sync {
    /// Latest quote, or `Ok(None)` when the feed has nothing new.
    fn fetch_latest_tick(&self, symbol: &str) -> Result<Option<Tick>, TradewindError>;

    /// Ticks with `start <= timestamp <= end`, in any order.
    fn fetch_historical_ticks(
        &self,
        symbol: &str,
        start: f64,
        end: f64,
    ) -> Result<Vec<Tick>, TradewindError>;

    /// Up to `count` most recent bars, oldest first.
    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Bar>, TradewindError>;
}
