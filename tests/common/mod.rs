#![allow(dead_code)]

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tradewind::domain::config::DashboardConfig;
use tradewind::domain::error::TradewindError;
pub use tradewind::domain::ohlcv::Bar;
use tradewind::domain::position::{OrderRequest, Position, Side};
pub use tradewind::domain::tick::Tick;
use tradewind::domain::timeframe::Timeframe;
use tradewind::ports::broker_port::BrokerPort;
use tradewind::ports::feed_port::FeedPort;

pub fn now_secs() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

pub fn make_tick(timestamp: f64, mid: f64) -> Tick {
    Tick {
        timestamp,
        bid: mid - 0.01,
        ask: mid + 0.01,
    }
}

pub fn make_bar(time: f64, close: f64) -> Bar {
    Bar {
        time,
        open: close - 0.5,
        high: close + 1.0,
        low: close - 1.0,
        close,
    }
}

/// One bar per minute ending at `end`, closes 1.0, 2.0, ...
pub fn minute_bars(count: usize, end: f64) -> Vec<Bar> {
    (0..count)
        .map(|i| make_bar(end - ((count - 1 - i) * 60) as f64, (i + 1) as f64))
        .collect()
}

/// One tick per second over `[start, start + seconds]`, mid rising
/// linearly from `from` to `to`.
pub fn rising_ticks(start: f64, seconds: usize, from: f64, to: f64) -> Vec<Tick> {
    (0..=seconds)
        .map(|i| {
            let price = from + (to - from) * i as f64 / seconds as f64;
            make_tick(start + i as f64, price)
        })
        .collect()
}

pub struct MockFeed {
    ticks: Mutex<HashMap<String, Vec<Tick>>>,
    bars: Mutex<HashMap<(String, Timeframe), Vec<Bar>>>,
    errors: HashMap<String, String>,
    tick_errors: HashMap<String, String>,
    tick_delay: Option<Duration>,
    pub tick_calls: AtomicUsize,
    pub bar_calls: AtomicUsize,
}

impl MockFeed {
    pub fn new() -> Self {
        Self {
            ticks: Mutex::new(HashMap::new()),
            bars: Mutex::new(HashMap::new()),
            errors: HashMap::new(),
            tick_errors: HashMap::new(),
            tick_delay: None,
            tick_calls: AtomicUsize::new(0),
            bar_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_ticks(self, symbol: &str, ticks: Vec<Tick>) -> Self {
        self.ticks.lock().unwrap().insert(symbol.to_string(), ticks);
        self
    }

    pub fn with_bars(self, symbol: &str, timeframe: Timeframe, bars: Vec<Bar>) -> Self {
        self.set_bars(symbol, timeframe, bars);
        self
    }

    /// Every call for `symbol` fails.
    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    /// Only latest-tick polls for `symbol` fail.
    pub fn with_tick_error(mut self, symbol: &str, reason: &str) -> Self {
        self.tick_errors
            .insert(symbol.to_string(), reason.to_string());
        self
    }

    /// Latest-tick polls block this long before answering.
    pub fn with_tick_delay(mut self, delay: Duration) -> Self {
        self.tick_delay = Some(delay);
        self
    }

    pub fn push_tick(&self, symbol: &str, tick: Tick) {
        self.ticks
            .lock()
            .unwrap()
            .entry(symbol.to_string())
            .or_default()
            .push(tick);
    }

    pub fn set_bars(&self, symbol: &str, timeframe: Timeframe, bars: Vec<Bar>) {
        self.bars
            .lock()
            .unwrap()
            .insert((symbol.to_string(), timeframe), bars);
    }

    fn check(&self, symbol: &str) -> Result<(), TradewindError> {
        match self.errors.get(symbol) {
            Some(reason) => Err(TradewindError::FeedUnavailable {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl FeedPort for MockFeed {
    fn fetch_latest_tick(&self, symbol: &str) -> Result<Option<Tick>, TradewindError> {
        self.tick_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.tick_delay {
            std::thread::sleep(delay);
        }
        self.check(symbol)?;
        if let Some(reason) = self.tick_errors.get(symbol) {
            return Err(TradewindError::FeedUnavailable {
                reason: reason.clone(),
            });
        }
        Ok(self
            .ticks
            .lock()
            .unwrap()
            .get(symbol)
            .and_then(|t| t.last().copied()))
    }

    fn fetch_historical_ticks(
        &self,
        symbol: &str,
        start: f64,
        end: f64,
    ) -> Result<Vec<Tick>, TradewindError> {
        self.check(symbol)?;
        Ok(self
            .ticks
            .lock()
            .unwrap()
            .get(symbol)
            .map(|ticks| {
                ticks
                    .iter()
                    .filter(|t| t.timestamp >= start && t.timestamp <= end)
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Bar>, TradewindError> {
        self.bar_calls.fetch_add(1, Ordering::SeqCst);
        self.check(symbol)?;
        let bars = self
            .bars
            .lock()
            .unwrap()
            .get(&(symbol.to_string(), timeframe))
            .cloned()
            .unwrap_or_default();
        let start = bars.len().saturating_sub(count);
        Ok(bars[start..].to_vec())
    }
}

/// Broker whose book only changes through [`MockBroker::fill`]; submitted
/// orders are recorded but never turn into positions on their own.
pub struct MockBroker {
    pub positions: Mutex<Vec<Position>>,
    pub orders: Mutex<Vec<OrderRequest>>,
    pub closes: Mutex<Vec<(u64, f64, f64, u32)>>,
    pub unavailable: AtomicBool,
    pub reject_orders: AtomicBool,
    order_delay: Option<Duration>,
    next_ticket: AtomicUsize,
}

impl MockBroker {
    pub fn new() -> Self {
        Self {
            positions: Mutex::new(Vec::new()),
            orders: Mutex::new(Vec::new()),
            closes: Mutex::new(Vec::new()),
            unavailable: AtomicBool::new(false),
            reject_orders: AtomicBool::new(false),
            order_delay: None,
            next_ticket: AtomicUsize::new(100),
        }
    }

    pub fn with_position(self, position: Position) -> Self {
        self.fill(position);
        self
    }

    /// Order submissions block this long before answering.
    pub fn with_order_delay(mut self, delay: Duration) -> Self {
        self.order_delay = Some(delay);
        self
    }

    pub fn fill(&self, position: Position) {
        self.positions.lock().unwrap().push(position);
    }

    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }
}

impl BrokerPort for MockBroker {
    fn list_open_positions(&self, symbol: &str) -> Result<Vec<Position>, TradewindError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(TradewindError::BrokerUnavailable {
                reason: "terminal offline".into(),
            });
        }
        Ok(self
            .positions
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.symbol == symbol)
            .cloned()
            .collect())
    }

    fn submit_order(&self, order: &OrderRequest) -> Result<u64, TradewindError> {
        if let Some(delay) = self.order_delay {
            std::thread::sleep(delay);
        }
        if self.reject_orders.load(Ordering::SeqCst) {
            return Err(TradewindError::BrokerUnavailable {
                reason: "market closed".into(),
            });
        }
        self.orders.lock().unwrap().push(order.clone());
        Ok(self.next_ticket.fetch_add(1, Ordering::SeqCst) as u64)
    }

    fn close_position(
        &self,
        ticket: u64,
        volume: f64,
        price: f64,
        deviation: u32,
    ) -> Result<(), TradewindError> {
        self.closes
            .lock()
            .unwrap()
            .push((ticket, volume, price, deviation));
        self.positions.lock().unwrap().retain(|p| p.ticket != ticket);
        Ok(())
    }
}

pub fn make_position(ticket: u64, symbol: &str, side: Side, profit: f64) -> Position {
    Position {
        ticket,
        symbol: symbol.to_string(),
        side,
        volume: 0.01,
        open_price: 100.0,
        profit,
    }
}

/// Defaults with cadences short enough for real-time tests.
pub fn fast_config() -> DashboardConfig {
    let mut config = DashboardConfig::default();
    config.cadence.tick_interval = Duration::from_millis(10);
    config.cadence.bar_interval = Duration::from_millis(40);
    config.cadence.zoom_repeat = Duration::from_millis(20);
    config.feed.fetch_timeout = Duration::from_millis(200);
    config.bar_count = 20;
    config
}
