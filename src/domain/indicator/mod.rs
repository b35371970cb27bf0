//! Chart indicators computed from a bar window.
//!
//! This module provides:
//! - `IndicatorKind` / `IndicatorSpec`: which overlay to draw and its parameters
//! - `IndicatorPoint` / `IndicatorValue`: one output point per input bar
//! - `IndicatorSeries`: a labelled series, split into named lines for drawing
//! - `compute`: the stateless entry point; every call recomputes from scratch

pub mod bollinger;
pub mod ema;
pub mod sma;
pub mod stddev;

use crate::domain::error::TradewindError;
use crate::domain::ohlcv::Bar;
use std::fmt;
use std::str::FromStr;

pub const MAX_PERIOD: usize = 200;
pub const MIN_DEVIATION: f64 = 0.1;
pub const MAX_DEVIATION: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndicatorKind {
    #[default]
    None,
    Sma,
    Ema,
    Bollinger,
}

impl FromStr for IndicatorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(IndicatorKind::None),
            "sma" => Ok(IndicatorKind::Sma),
            "ema" => Ok(IndicatorKind::Ema),
            "bollinger" | "bb" => Ok(IndicatorKind::Bollinger),
            other => Err(format!("unknown indicator type '{other}'")),
        }
    }
}

/// Overlay configuration. Changed only through an explicit apply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorSpec {
    pub kind: IndicatorKind,
    pub period: usize,
    /// Band multiplier, Bollinger only.
    pub deviation: f64,
}

impl Default for IndicatorSpec {
    fn default() -> Self {
        Self {
            kind: IndicatorKind::None,
            period: 20,
            deviation: 2.0,
        }
    }
}

impl IndicatorSpec {
    pub fn new(kind: IndicatorKind, period: usize, deviation: f64) -> Self {
        Self {
            kind,
            period,
            deviation,
        }
    }

    pub fn validate(&self) -> Result<(), TradewindError> {
        if self.period == 0 || self.period > MAX_PERIOD {
            return Err(TradewindError::invalid(
                "indicator",
                "period",
                format!("period must be between 1 and {MAX_PERIOD}"),
            ));
        }
        if !(MIN_DEVIATION..=MAX_DEVIATION).contains(&self.deviation) {
            return Err(TradewindError::invalid(
                "indicator",
                "deviation",
                format!("deviation must be between {MIN_DEVIATION} and {MAX_DEVIATION}"),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for IndicatorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            IndicatorKind::None => write!(f, "NONE"),
            IndicatorKind::Sma => write!(f, "SMA({})", self.period),
            IndicatorKind::Ema => write!(f, "EMA({})", self.period),
            IndicatorKind::Bollinger => write!(f, "BOLLINGER({},{})", self.period, self.deviation),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorPoint {
    pub time: f64,
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
    Bollinger { upper: f64, middle: f64, lower: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub spec: IndicatorSpec,
    pub values: Vec<IndicatorPoint>,
}

/// One drawable line: `None` where the indicator is still warming up.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedLine {
    pub name: String,
    pub points: Vec<(f64, Option<f64>)>,
}

impl IndicatorSeries {
    /// Split the series into the lines a chart draws: one for SMA/EMA,
    /// upper/middle/lower for Bollinger.
    pub fn lines(&self) -> Vec<NamedLine> {
        let label = self.spec.to_string();
        match self.spec.kind {
            IndicatorKind::None => Vec::new(),
            IndicatorKind::Sma | IndicatorKind::Ema => vec![NamedLine {
                name: label,
                points: self
                    .values
                    .iter()
                    .map(|p| match p.value {
                        IndicatorValue::Simple(v) if p.valid => (p.time, Some(v)),
                        _ => (p.time, None),
                    })
                    .collect(),
            }],
            IndicatorKind::Bollinger => {
                let band = |pick: fn(f64, f64, f64) -> f64, suffix: &str| NamedLine {
                    name: format!("{label} {suffix}"),
                    points: self
                        .values
                        .iter()
                        .map(|p| match p.value {
                            IndicatorValue::Bollinger {
                                upper,
                                middle,
                                lower,
                            } if p.valid => (p.time, Some(pick(upper, middle, lower))),
                            _ => (p.time, None),
                        })
                        .collect(),
                };
                vec![
                    band(|u, _, _| u, "upper"),
                    band(|_, m, _| m, "middle"),
                    band(|_, _, l| l, "lower"),
                ]
            }
        }
    }

    /// Most recent valid point, if any.
    pub fn last_valid(&self) -> Option<&IndicatorPoint> {
        self.values.iter().rev().find(|p| p.valid)
    }
}

/// Compute the overlay for `bars`. `None` yields no series.
pub fn compute(bars: &[Bar], spec: &IndicatorSpec) -> Vec<IndicatorSeries> {
    match spec.kind {
        IndicatorKind::None => Vec::new(),
        IndicatorKind::Sma => vec![sma::calculate_sma(bars, spec.period)],
        IndicatorKind::Ema => vec![ema::calculate_ema(bars, spec.period)],
        IndicatorKind::Bollinger => vec![bollinger::calculate_bollinger(
            bars,
            spec.period,
            spec.deviation,
        )],
    }
}
