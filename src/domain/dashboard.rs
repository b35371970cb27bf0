//! State owned by the poll loop, and the snapshots handed to renderers.
//!
//! Every ingest method takes data that was already fetched, so a failed
//! or empty fetch is simply `None`/`Err` here and leaves the displayed
//! state as it was.

use crate::domain::bar_series::BarSeries;
use crate::domain::config::DashboardConfig;
use crate::domain::error::TradewindError;
use crate::domain::indicator::{self, IndicatorSeries, IndicatorSpec};
use crate::domain::ohlcv::Bar;
use crate::domain::tick::{Quote, Sample, Tick};
use crate::domain::timeframe::{AxisGranularity, Timeframe};
use crate::domain::timeseries::TimeSeriesBuffer;
use crate::domain::viewport::{ViewportController, ViewportState, ZoomAction};

/// Consistent copy of everything a renderer draws.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSnapshot {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub axis: AxisGranularity,
    pub viewport: ViewportState,
    pub samples: Vec<Sample>,
    pub bars: Vec<Bar>,
    pub bar_width: Option<f64>,
    pub bar_x_limits: Option<(f64, f64)>,
    pub indicator: IndicatorSpec,
    pub indicators: Vec<IndicatorSeries>,
    pub quote: Option<Quote>,
    pub pl: Option<f64>,
}

impl DashboardSnapshot {
    /// "P/L: 12.34"; a dash until the first successful query.
    pub fn pl_label(&self) -> String {
        pl_label(self.pl)
    }
}

pub fn pl_label(pl: Option<f64>) -> String {
    match pl {
        Some(v) => format!("P/L: {v:.2}"),
        None => "P/L: -".to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    symbol: String,
    ticks: TimeSeriesBuffer,
    bars: BarSeries,
    viewport: ViewportController,
    indicator: IndicatorSpec,
    indicators: Vec<IndicatorSeries>,
    bar_count: usize,
    quote: Option<Quote>,
    pl: Option<f64>,
}

impl Dashboard {
    pub fn new(symbol: &str, config: &DashboardConfig) -> Self {
        Self {
            symbol: symbol.to_string(),
            ticks: TimeSeriesBuffer::new(config.window_seconds),
            bars: BarSeries::new(config.timeframe),
            viewport: ViewportController::new(config.x_scale_seconds, config.y_zoom_factor),
            indicator: config.indicator,
            indicators: Vec::new(),
            bar_count: config.bar_count.max(1),
            quote: None,
            pl: None,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timeframe(&self) -> Timeframe {
        self.bars.timeframe()
    }

    pub fn bar_count(&self) -> usize {
        self.bar_count
    }

    pub fn quote(&self) -> Option<Quote> {
        self.quote
    }

    pub fn pl(&self) -> Option<f64> {
        self.pl
    }

    pub fn ticks(&self) -> &TimeSeriesBuffer {
        &self.ticks
    }

    pub fn bars(&self) -> &BarSeries {
        &self.bars
    }

    pub fn viewport(&self) -> &ViewportState {
        self.viewport.state()
    }

    pub fn indicators(&self) -> &[IndicatorSeries] {
        &self.indicators
    }

    /// Load the startup history. The latest tick also becomes the quote.
    /// Ticks with non-finite fields are dropped.
    pub fn seed(&mut self, mut history: Vec<Tick>, now: f64) {
        history.retain(Tick::is_finite);
        if let Some(last) = history.iter().max_by(|a, b| a.timestamp.total_cmp(&b.timestamp)) {
            self.quote = Some(last.quote());
        }
        self.ticks.seed(history.iter().map(Tick::to_sample).collect());
        self.ticks.evict_expired(now);
        self.viewport.recompute(self.ticks.iter(), now);
    }

    /// Fast cadence: append the tick, evict expired samples, refresh the
    /// viewport. Returns false when there was nothing to ingest.
    pub fn ingest_tick(&mut self, tick: Option<Tick>, now: f64) -> bool {
        let Some(tick) = tick.filter(Tick::is_finite) else {
            return false;
        };
        self.quote = Some(tick.quote());
        if self
            .ticks
            .newest()
            .is_some_and(|last| tick.timestamp < last.timestamp)
        {
            // Stale quote; keep the buffer ordered.
            return false;
        }
        self.ticks.append(tick.to_sample());
        self.ticks.evict_expired(now);
        self.viewport.recompute(self.ticks.iter(), now);
        true
    }

    /// Slow cadence: replace the bars and recompute the overlay. Empty or
    /// failed fetches keep the previous bars.
    pub fn ingest_bars(&mut self, bars: Option<Vec<Bar>>) -> Result<bool, TradewindError> {
        match bars {
            Some(bars) if !bars.is_empty() => {
                self.bars.replace(bars)?;
                self.recompute_indicators();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Record a fresh P/L figure; a failed query keeps the last one shown.
    pub fn record_pl(&mut self, pl: Result<f64, TradewindError>) {
        if let Ok(value) = pl {
            self.pl = Some(value);
        }
    }

    pub fn apply_zoom(&mut self, action: ZoomAction, now: f64) {
        self.viewport.apply(action);
        self.viewport.recompute(self.ticks.iter(), now);
    }

    /// Swap the overlay settings and redraw at once.
    pub fn apply_config(&mut self, spec: IndicatorSpec) -> Result<(), TradewindError> {
        spec.validate()?;
        self.indicator = spec;
        self.recompute_indicators();
        Ok(())
    }

    pub fn select_interval(&mut self, timeframe: Timeframe) {
        self.bars.select_interval(timeframe);
    }

    /// Switch instrument. Prices of two symbols never share a buffer.
    pub fn select_symbol(&mut self, symbol: &str) {
        if symbol == self.symbol {
            return;
        }
        self.symbol = symbol.to_string();
        self.ticks.clear();
        self.bars.clear();
        self.indicators.clear();
        self.viewport.reset_y();
        self.quote = None;
        self.pl = None;
    }

    fn recompute_indicators(&mut self) {
        self.indicators = indicator::compute(self.bars.tail(self.bar_count), &self.indicator);
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            symbol: self.symbol.clone(),
            timeframe: self.bars.timeframe(),
            axis: self.bars.axis_granularity(),
            viewport: *self.viewport.state(),
            samples: self.ticks.to_vec(),
            bars: self.bars.tail(self.bar_count).to_vec(),
            bar_width: self.bars.bar_width(),
            bar_x_limits: self.bars.x_limits(self.bar_count),
            indicator: self.indicator,
            indicators: self.indicators.clone(),
            quote: self.quote,
            pl: self.pl,
        }
    }
}
