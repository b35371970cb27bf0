//! Bars for the selected timeframe, replaced wholesale on every poll.

use crate::domain::error::TradewindError;
use crate::domain::ohlcv::Bar;
use crate::domain::timeframe::{AxisGranularity, Timeframe};

/// Fraction of the bar period a drawn candle occupies.
pub const BAR_WIDTH_RATIO: f64 = 0.8;

/// Candles of empty space kept right of the newest bar.
pub const RIGHT_MARGIN_BARS: f64 = 10.0;

#[derive(Debug, Clone)]
pub struct BarSeries {
    timeframe: Timeframe,
    bars: Vec<Bar>,
    bar_width: Option<f64>,
}

impl BarSeries {
    pub fn new(timeframe: Timeframe) -> Self {
        Self {
            timeframe,
            bars: Vec::new(),
            bar_width: None,
        }
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn axis_granularity(&self) -> AxisGranularity {
        self.timeframe.axis_granularity()
    }

    /// Swap in a freshly fetched series. The width is captured from the
    /// first replacement holding two or more bars and then frozen until
    /// the timeframe changes.
    pub fn replace(&mut self, bars: Vec<Bar>) -> Result<(), TradewindError> {
        if let Some(pos) = bars.windows(2).position(|w| w[1].time < w[0].time) {
            return Err(TradewindError::DataFormat {
                reason: format!("bars out of order at index {}", pos + 1),
            });
        }
        self.bars = bars;
        if self.bar_width.is_none() {
            if let [.., prev, last] = self.bars.as_slice() {
                self.bar_width = Some(BAR_WIDTH_RATIO * (last.time - prev.time));
            }
        }
        Ok(())
    }

    pub fn bar_width(&self) -> Option<f64> {
        self.bar_width
    }

    /// Change timeframe; forgets the cached width.
    pub fn select_interval(&mut self, timeframe: Timeframe) {
        self.timeframe = timeframe;
        self.bar_width = None;
    }

    /// Drop every bar and the cached width, keeping the timeframe.
    pub fn clear(&mut self) {
        self.bars.clear();
        self.bar_width = None;
    }

    /// The most recent `n` bars, oldest first.
    pub fn tail(&self, n: usize) -> &[Bar] {
        let start = self.bars.len().saturating_sub(n);
        &self.bars[start..]
    }

    /// Horizontal limits for drawing `tail(n)`: from the first bar to ten
    /// bar widths past the last. None until the width is known.
    pub fn x_limits(&self, n: usize) -> Option<(f64, f64)> {
        let width = self.bar_width?;
        let tail = self.tail(n);
        let first = tail.first()?;
        let last = tail.last()?;
        Some((first.time, last.time + width * RIGHT_MARGIN_BARS))
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}
