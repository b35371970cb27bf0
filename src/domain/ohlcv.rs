//! OHLC bar representation.

/// One bar of a timeframe. `time` is the bar open in chart-time units
/// (Unix seconds for every feed in this crate).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub time: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}
