//! Configuration validation.
//!
//! Checks every dashboard key before the poll loop starts.

use crate::domain::error::TradewindError;
use crate::domain::indicator::{IndicatorKind, MAX_DEVIATION, MAX_PERIOD, MIN_DEVIATION};
use crate::domain::timeframe::Timeframe;
use crate::ports::config_port::ConfigPort;

pub const MAX_BAR_COUNT: i64 = 1440;
pub const MIN_LOT: f64 = 0.01;
pub const MAX_LOT: f64 = 1000.0;

pub fn validate_dashboard_config(config: &dyn ConfigPort) -> Result<(), TradewindError> {
    validate_feed(config)?;
    validate_cadence(config)?;
    validate_window(config)?;
    validate_zoom(config)?;
    validate_bars(config)?;
    validate_indicator(config)?;
    validate_trading(config)?;
    Ok(())
}

/// The CSV feed needs a directory to read from.
pub fn require_data_dir(config: &dyn ConfigPort) -> Result<String, TradewindError> {
    match config.get_string("feed", "data_dir") {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(TradewindError::ConfigMissing {
            section: "feed".to_string(),
            key: "data_dir".to_string(),
        }),
    }
}

/// Reject present-but-unparseable numbers instead of silently defaulting.
/// `nan` and `inf` parse as floats but are never valid settings.
fn numeric(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<f64>, TradewindError> {
    let Some(raw) = config.get_string(section, key) else {
        return Ok(None);
    };
    let raw = raw.trim();
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        Ok(_) => Err(TradewindError::invalid(
            section,
            key,
            format!("'{raw}' is not a finite number"),
        )),
        Err(_) => Err(TradewindError::invalid(
            section,
            key,
            format!("'{raw}' is not a number"),
        )),
    }
}

/// Keys read back with `get_int`, which only understands plain integers;
/// anything else would be dropped in favour of the default.
fn integer(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<i64>, TradewindError> {
    let Some(value) = numeric(config, section, key)? else {
        return Ok(None);
    };
    let raw = config.get_string(section, key).unwrap_or_default();
    match raw.trim().parse::<i64>() {
        Ok(parsed) => Ok(Some(parsed)),
        Err(_) => Err(TradewindError::invalid(
            section,
            key,
            format!("{key} must be a whole number, got {value}"),
        )),
    }
}

fn validate_feed(config: &dyn ConfigPort) -> Result<(), TradewindError> {
    if config.get_string("feed", "symbols").is_some() && config.get_list("feed", "symbols").is_empty()
    {
        return Err(TradewindError::invalid(
            "feed",
            "symbols",
            "at least one symbol is required",
        ));
    }
    if let Some(ms) = integer(config, "feed", "fetch_timeout_ms")? {
        if ms <= 0 {
            return Err(TradewindError::invalid(
                "feed",
                "fetch_timeout_ms",
                "fetch_timeout_ms must be positive",
            ));
        }
    }
    if let Some(minutes) = numeric(config, "feed", "history_minutes")? {
        if minutes < 0.0 {
            return Err(TradewindError::invalid(
                "feed",
                "history_minutes",
                "history_minutes must be non-negative",
            ));
        }
    }
    Ok(())
}

fn validate_cadence(config: &dyn ConfigPort) -> Result<(), TradewindError> {
    for key in ["tick_interval_ms", "bar_interval_ms", "zoom_repeat_ms"] {
        if let Some(ms) = integer(config, "dashboard", key)? {
            if ms < 1 {
                return Err(TradewindError::invalid(
                    "dashboard",
                    key,
                    format!("{key} must be at least 1"),
                ));
            }
        }
    }
    Ok(())
}

fn validate_window(config: &dyn ConfigPort) -> Result<(), TradewindError> {
    if let Some(minutes) = numeric(config, "dashboard", "window_minutes")? {
        if minutes <= 0.0 {
            return Err(TradewindError::invalid(
                "dashboard",
                "window_minutes",
                "window_minutes must be positive",
            ));
        }
    }
    if let Some(hours) = numeric(config, "dashboard", "utc_offset_hours")? {
        if !(-23.0..=23.0).contains(&hours) {
            return Err(TradewindError::invalid(
                "dashboard",
                "utc_offset_hours",
                "utc_offset_hours must be between -23 and 23",
            ));
        }
    }
    Ok(())
}

fn validate_zoom(config: &dyn ConfigPort) -> Result<(), TradewindError> {
    if let Some(seconds) = numeric(config, "dashboard", "x_scale_seconds")? {
        if seconds < 60.0 {
            return Err(TradewindError::invalid(
                "dashboard",
                "x_scale_seconds",
                "x_scale_seconds must be at least 60",
            ));
        }
    }
    if let Some(factor) = numeric(config, "dashboard", "y_zoom_factor")? {
        if !(0.1..=10.0).contains(&factor) {
            return Err(TradewindError::invalid(
                "dashboard",
                "y_zoom_factor",
                "y_zoom_factor must be between 0.1 and 10",
            ));
        }
    }
    Ok(())
}

fn validate_bars(config: &dyn ConfigPort) -> Result<(), TradewindError> {
    if let Some(count) = integer(config, "dashboard", "bar_count")? {
        if !(1..=MAX_BAR_COUNT).contains(&count) {
            return Err(TradewindError::invalid(
                "dashboard",
                "bar_count",
                format!("bar_count must be an integer between 1 and {MAX_BAR_COUNT}"),
            ));
        }
    }
    if let Some(minutes) = integer(config, "dashboard", "timeframe")? {
        let supported = u32::try_from(minutes)
            .ok()
            .and_then(Timeframe::from_minutes)
            .is_some();
        if !supported {
            return Err(TradewindError::invalid(
                "dashboard",
                "timeframe",
                "timeframe must be one of 1, 5, 60, 240, 1440",
            ));
        }
    }
    Ok(())
}

fn validate_indicator(config: &dyn ConfigPort) -> Result<(), TradewindError> {
    if let Some(raw) = config.get_string("indicator", "type") {
        raw.parse::<IndicatorKind>()
            .map_err(|reason| TradewindError::invalid("indicator", "type", reason))?;
    }
    if let Some(period) = integer(config, "indicator", "period")? {
        if period < 1 || period > MAX_PERIOD as i64 {
            return Err(TradewindError::invalid(
                "indicator",
                "period",
                format!("period must be an integer between 1 and {MAX_PERIOD}"),
            ));
        }
    }
    if let Some(dev) = numeric(config, "indicator", "deviation")? {
        if !(MIN_DEVIATION..=MAX_DEVIATION).contains(&dev) {
            return Err(TradewindError::invalid(
                "indicator",
                "deviation",
                format!("deviation must be between {MIN_DEVIATION} and {MAX_DEVIATION}"),
            ));
        }
    }
    Ok(())
}

fn validate_trading(config: &dyn ConfigPort) -> Result<(), TradewindError> {
    if let Some(lot) = numeric(config, "trading", "lot")? {
        if !(MIN_LOT..=MAX_LOT).contains(&lot) {
            return Err(TradewindError::invalid(
                "trading",
                "lot",
                format!("lot must be between {MIN_LOT} and {MAX_LOT}"),
            ));
        }
    }
    if let Some(dev) = integer(config, "trading", "deviation")? {
        if dev < 0 {
            return Err(TradewindError::invalid(
                "trading",
                "deviation",
                "deviation must be a non-negative integer",
            ));
        }
    }
    if let Some(magic) = integer(config, "trading", "magic")? {
        if magic < 0 {
            return Err(TradewindError::invalid(
                "trading",
                "magic",
                "magic must be a non-negative integer",
            ));
        }
    }
    if let Some(size) = numeric(config, "trading", "contract_size")? {
        if size <= 0.0 {
            return Err(TradewindError::invalid(
                "trading",
                "contract_size",
                "contract_size must be positive",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn validate(ini: &str) -> Result<(), TradewindError> {
        let adapter = FileConfigAdapter::from_string(ini).unwrap();
        validate_dashboard_config(&adapter)
    }

    fn invalid_key(ini: &str) -> String {
        match validate(ini) {
            Err(TradewindError::ConfigInvalid { key, .. }) => key,
            other => panic!("expected ConfigInvalid, got {other:?}"),
        }
    }

    #[test]
    fn full_config_is_valid() {
        let ini = r#"
[feed]
data_dir = /data
symbols = XAUUSDs,USDJPY
fetch_timeout_ms = 500

[dashboard]
tick_interval_ms = 100
bar_interval_ms = 1000
zoom_repeat_ms = 150
bar_count = 50
timeframe = 5

[indicator]
type = EMA
period = 20
deviation = 2.0

[trading]
lot = 0.01
deviation = 10
magic = 234000
"#;
        assert!(validate(ini).is_ok());
    }

    #[test]
    fn empty_config_is_valid() {
        assert!(validate("[dashboard]\n").is_ok());
    }

    #[test]
    fn bar_count_range() {
        assert_eq!(invalid_key("[dashboard]\nbar_count = 0\n"), "bar_count");
        assert_eq!(invalid_key("[dashboard]\nbar_count = 1441\n"), "bar_count");
        assert!(validate("[dashboard]\nbar_count = 1440\n").is_ok());
    }

    #[test]
    fn non_numeric_value_is_reported() {
        assert_eq!(invalid_key("[dashboard]\ntick_interval_ms = fast\n"), "tick_interval_ms");
    }

    #[test]
    fn non_finite_values_are_rejected() {
        assert_eq!(invalid_key("[dashboard]\nwindow_minutes = nan\n"), "window_minutes");
        assert_eq!(invalid_key("[dashboard]\nwindow_minutes = inf\n"), "window_minutes");
        assert_eq!(invalid_key("[feed]\nhistory_minutes = inf\n"), "history_minutes");
        assert_eq!(invalid_key("[trading]\ncontract_size = NaN\n"), "contract_size");
    }

    #[test]
    fn integer_keys_reject_fractions() {
        assert_eq!(invalid_key("[dashboard]\ntick_interval_ms = 1.5\n"), "tick_interval_ms");
        assert_eq!(invalid_key("[feed]\nfetch_timeout_ms = 250.5\n"), "fetch_timeout_ms");
        assert_eq!(invalid_key("[dashboard]\nbar_count = 2.5\n"), "bar_count");
        assert_eq!(invalid_key("[dashboard]\ntick_interval_ms = 250.0\n"), "tick_interval_ms");
        assert!(validate("[dashboard]\ntick_interval_ms = 250\n").is_ok());
    }

    #[test]
    fn timeframe_must_be_in_catalogue() {
        assert_eq!(invalid_key("[dashboard]\ntimeframe = 30\n"), "timeframe");
        assert!(validate("[dashboard]\ntimeframe = 1440\n").is_ok());
    }

    #[test]
    fn indicator_limits() {
        assert_eq!(invalid_key("[indicator]\ntype = vwap\n"), "type");
        assert_eq!(invalid_key("[indicator]\nperiod = 0\n"), "period");
        assert_eq!(invalid_key("[indicator]\nperiod = 201\n"), "period");
        assert_eq!(invalid_key("[indicator]\ndeviation = 0.05\n"), "deviation");
    }

    #[test]
    fn zoom_limits() {
        assert_eq!(invalid_key("[dashboard]\nx_scale_seconds = 30\n"), "x_scale_seconds");
        assert_eq!(invalid_key("[dashboard]\ny_zoom_factor = 11\n"), "y_zoom_factor");
    }

    #[test]
    fn lot_limits() {
        assert_eq!(invalid_key("[trading]\nlot = 0.001\n"), "lot");
        assert_eq!(invalid_key("[trading]\nlot = 5000\n"), "lot");
    }

    #[test]
    fn empty_symbol_list_is_invalid() {
        assert_eq!(invalid_key("[feed]\nsymbols = ,\n"), "symbols");
    }

    #[test]
    fn data_dir_required_for_csv_feed() {
        let adapter = FileConfigAdapter::from_string("[feed]\n").unwrap();
        assert!(matches!(
            require_data_dir(&adapter),
            Err(TradewindError::ConfigMissing { .. })
        ));
        let adapter = FileConfigAdapter::from_string("[feed]\ndata_dir = /data\n").unwrap();
        assert_eq!(require_data_dir(&adapter).unwrap(), "/data");
    }
}
