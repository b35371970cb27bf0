//! Dashboard settings assembled from a [`ConfigPort`].

use crate::domain::error::TradewindError;
use crate::domain::indicator::{IndicatorKind, IndicatorSpec};
use crate::domain::position_tracker::OrderDefaults;
use crate::domain::timeframe::Timeframe;
use crate::ports::config_port::ConfigPort;
use chrono::FixedOffset;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct FeedSettings {
    pub data_dir: Option<PathBuf>,
    pub symbols: Vec<String>,
    pub fetch_timeout: Duration,
    pub history_seconds: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cadence {
    pub tick_interval: Duration,
    pub bar_interval: Duration,
    pub zoom_repeat: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradingSettings {
    pub lot: f64,
    pub orders: OrderDefaults,
    /// Units per lot, used by the paper broker to mark profit.
    pub contract_size: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub feed: FeedSettings,
    pub cadence: Cadence,
    pub window_seconds: f64,
    pub x_scale_seconds: f64,
    pub y_zoom_factor: f64,
    pub bar_count: usize,
    pub timeframe: Timeframe,
    pub utc_offset: FixedOffset,
    pub indicator: IndicatorSpec,
    pub trading: TradingSettings,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            feed: FeedSettings {
                data_dir: None,
                symbols: vec!["XAUUSDs".to_string(), "USDJPY".to_string()],
                fetch_timeout: Duration::from_millis(500),
                history_seconds: 30.0 * 60.0,
            },
            cadence: Cadence {
                tick_interval: Duration::from_millis(100),
                bar_interval: Duration::from_millis(1000),
                zoom_repeat: Duration::from_millis(150),
            },
            window_seconds: 30.0 * 60.0,
            x_scale_seconds: 30.0 * 60.0,
            y_zoom_factor: 1.0,
            bar_count: 50,
            timeframe: Timeframe::M1,
            utc_offset: TOKYO,
            indicator: IndicatorSpec::default(),
            trading: TradingSettings {
                lot: 0.01,
                orders: OrderDefaults::default(),
                contract_size: 1.0,
            },
        }
    }
}

const TOKYO: FixedOffset = match FixedOffset::east_opt(9 * 3600) {
    Some(offset) => offset,
    None => panic!("offset out of range"),
};

fn millis(config: &dyn ConfigPort, section: &str, key: &str, default: Duration) -> Duration {
    let ms = config.get_int(section, key, default.as_millis() as i64);
    Duration::from_millis(ms.max(0) as u64)
}

impl DashboardConfig {
    /// Build settings from `config`, falling back to defaults for absent
    /// keys. Values that cannot be interpreted are reported, not defaulted.
    pub fn from_port(config: &dyn ConfigPort) -> Result<Self, TradewindError> {
        let d = DashboardConfig::default();

        let symbols = {
            let listed = config.get_list("feed", "symbols");
            if listed.is_empty() { d.feed.symbols.clone() } else { listed }
        };

        let minutes = config.get_int("dashboard", "timeframe", d.timeframe.minutes() as i64);
        let timeframe = u32::try_from(minutes)
            .ok()
            .and_then(Timeframe::from_minutes)
            .ok_or_else(|| {
                TradewindError::invalid(
                    "dashboard",
                    "timeframe",
                    format!("unsupported timeframe {minutes}, expected one of 1, 5, 60, 240, 1440"),
                )
            })?;

        let offset_hours = config.get_double("dashboard", "utc_offset_hours", 9.0);
        let utc_offset = FixedOffset::east_opt((offset_hours * 3600.0).round() as i32)
            .ok_or_else(|| {
                TradewindError::invalid("dashboard", "utc_offset_hours", "offset out of range")
            })?;

        let kind = match config.get_string("indicator", "type") {
            Some(raw) => raw
                .parse::<IndicatorKind>()
                .map_err(|reason| TradewindError::invalid("indicator", "type", reason))?,
            None => d.indicator.kind,
        };

        let bar_count = config.get_int("dashboard", "bar_count", d.bar_count as i64);
        let period = config.get_int("indicator", "period", d.indicator.period as i64);
        let deviation = config.get_int("trading", "deviation", d.trading.orders.deviation as i64);
        let magic = config.get_int("trading", "magic", d.trading.orders.magic as i64);

        Ok(DashboardConfig {
            feed: FeedSettings {
                data_dir: config.get_string("feed", "data_dir").map(PathBuf::from),
                symbols,
                fetch_timeout: millis(config, "feed", "fetch_timeout_ms", d.feed.fetch_timeout),
                history_seconds: config.get_double("feed", "history_minutes", 30.0) * 60.0,
            },
            cadence: Cadence {
                tick_interval: millis(config, "dashboard", "tick_interval_ms", d.cadence.tick_interval),
                bar_interval: millis(config, "dashboard", "bar_interval_ms", d.cadence.bar_interval),
                zoom_repeat: millis(config, "dashboard", "zoom_repeat_ms", d.cadence.zoom_repeat),
            },
            window_seconds: config.get_double("dashboard", "window_minutes", 30.0) * 60.0,
            x_scale_seconds: config.get_double("dashboard", "x_scale_seconds", d.x_scale_seconds),
            y_zoom_factor: config.get_double("dashboard", "y_zoom_factor", d.y_zoom_factor),
            bar_count: bar_count.max(0) as usize,
            timeframe,
            utc_offset,
            indicator: IndicatorSpec {
                kind,
                period: period.max(0) as usize,
                deviation: config.get_double("indicator", "deviation", d.indicator.deviation),
            },
            trading: TradingSettings {
                lot: config.get_double("trading", "lot", d.trading.lot),
                orders: OrderDefaults {
                    deviation: deviation.clamp(0, u32::MAX as i64) as u32,
                    magic: magic.max(0) as u64,
                    comment: config
                        .get_string("trading", "comment")
                        .unwrap_or(d.trading.orders.comment),
                },
                contract_size: config.get_double("trading", "contract_size", d.trading.contract_size),
            },
        })
    }

    /// The symbol shown at startup.
    pub fn initial_symbol(&self) -> &str {
        self.feed.symbols.first().map(String::as_str).unwrap_or("XAUUSDs")
    }
}
