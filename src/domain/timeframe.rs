//! Bar timeframes and the values derived purely from them.

use chrono::{DateTime, FixedOffset, Timelike, Utc};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timeframe {
    M1,
    M5,
    H1,
    H4,
    D1,
}

/// How coarse the time-axis labels are for a timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisGranularity {
    SubHour,
    SubDay,
    Daily,
}

impl AxisGranularity {
    /// strftime pattern for the axis labels.
    pub fn label_format(&self) -> &'static str {
        match self {
            AxisGranularity::SubHour => "%H:%M",
            AxisGranularity::SubDay => "%H",
            AxisGranularity::Daily => "%Y-%m-%d",
        }
    }
}

impl Timeframe {
    pub const ALL: [Timeframe; 5] = [
        Timeframe::M1,
        Timeframe::M5,
        Timeframe::H1,
        Timeframe::H4,
        Timeframe::D1,
    ];

    pub fn minutes(&self) -> u32 {
        match self {
            Timeframe::M1 => 1,
            Timeframe::M5 => 5,
            Timeframe::H1 => 60,
            Timeframe::H4 => 240,
            Timeframe::D1 => 1440,
        }
    }

    pub fn from_minutes(minutes: u32) -> Option<Timeframe> {
        Self::ALL.into_iter().find(|tf| tf.minutes() == minutes)
    }

    pub fn seconds(&self) -> f64 {
        self.minutes() as f64 * 60.0
    }

    pub fn axis_granularity(&self) -> AxisGranularity {
        let minutes = self.minutes();
        if minutes < 60 {
            AxisGranularity::SubHour
        } else if minutes < 1440 {
            AxisGranularity::SubDay
        } else {
            AxisGranularity::Daily
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let minutes = self.minutes();
        if minutes < 60 {
            write!(f, "{}m", minutes)
        } else if minutes < 1440 {
            write!(f, "{}H", minutes / 60)
        } else {
            write!(f, "1d")
        }
    }
}

/// Number of bars to request so intraday timeframes always cover the
/// whole day so far: max(configured, minutes since local midnight + 1).
pub fn bars_to_fetch(configured: usize, now: DateTime<Utc>, offset: FixedOffset) -> usize {
    let local = now.with_timezone(&offset);
    let bars_today = (local.hour() * 60 + local.minute() + 1) as usize;
    configured.max(bars_today)
}
