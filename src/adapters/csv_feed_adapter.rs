//! CSV file feed adapter.
//!
//! Each symbol has one tick file, `{symbol}_ticks.csv` with columns
//! `timestamp,bid,ask`, and one bar file per timeframe,
//! `{symbol}_{label}.csv` (label `1m`, `5m`, `1H`, `4H` or `1d`) with
//! columns `time,open,high,low,close`. Times are Unix seconds. Files are
//! re-read on every call so another process can keep appending to them.

use crate::domain::error::TradewindError;
use crate::domain::ohlcv::Bar;
use crate::domain::tick::Tick;
use crate::domain::timeframe::Timeframe;
use crate::ports::feed_port::FeedPort;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct CsvFeedAdapter {
    base_path: PathBuf,
}

impl CsvFeedAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn tick_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}_ticks.csv"))
    }

    fn bar_path(&self, symbol: &str, timeframe: Timeframe) -> PathBuf {
        self.base_path.join(format!("{symbol}_{timeframe}.csv"))
    }

    fn read_ticks(&self, symbol: &str) -> Result<Vec<Tick>, TradewindError> {
        let path = self.tick_path(symbol);
        let mut ticks = Vec::new();
        for record in read_records(&path)? {
            ticks.push(Tick {
                timestamp: field(&record, 0, "timestamp")?,
                bid: field(&record, 1, "bid")?,
                ask: field(&record, 2, "ask")?,
            });
        }
        Ok(ticks)
    }
}

fn read_records(path: &Path) -> Result<Vec<csv::StringRecord>, TradewindError> {
    let content = fs::read_to_string(path).map_err(|e| TradewindError::FeedUnavailable {
        reason: format!("failed to read {}: {}", path.display(), e),
    })?;

    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    rdr.records()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TradewindError::DataFormat {
            reason: format!("CSV parse error in {}: {}", path.display(), e),
        })
}

fn field(record: &csv::StringRecord, index: usize, name: &str) -> Result<f64, TradewindError> {
    let raw = record.get(index).ok_or_else(|| TradewindError::DataFormat {
        reason: format!("missing {name} column"),
    })?;
    let value: f64 = raw.parse().map_err(|e| TradewindError::DataFormat {
        reason: format!("invalid {name} value '{raw}': {e}"),
    })?;
    if !value.is_finite() {
        return Err(TradewindError::DataFormat {
            reason: format!("non-finite {name} value '{raw}'"),
        });
    }
    Ok(value)
}

impl FeedPort for CsvFeedAdapter {
    fn fetch_latest_tick(&self, symbol: &str) -> Result<Option<Tick>, TradewindError> {
        let ticks = self.read_ticks(symbol)?;
        Ok(ticks
            .into_iter()
            .max_by(|a, b| a.timestamp.total_cmp(&b.timestamp)))
    }

    fn fetch_historical_ticks(
        &self,
        symbol: &str,
        start: f64,
        end: f64,
    ) -> Result<Vec<Tick>, TradewindError> {
        let mut ticks: Vec<Tick> = self
            .read_ticks(symbol)?
            .into_iter()
            .filter(|t| t.timestamp >= start && t.timestamp <= end)
            .collect();
        ticks.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        debug!(symbol, count = ticks.len(), start, end, "historical ticks loaded");
        Ok(ticks)
    }

    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Bar>, TradewindError> {
        let path = self.bar_path(symbol, timeframe);
        let mut bars = Vec::new();
        for record in read_records(&path)? {
            bars.push(Bar {
                time: field(&record, 0, "time")?,
                open: field(&record, 1, "open")?,
                high: field(&record, 2, "high")?,
                low: field(&record, 3, "low")?,
                close: field(&record, 4, "close")?,
            });
        }
        bars.sort_by(|a, b| a.time.total_cmp(&b.time));
        let start = bars.len().saturating_sub(count);
        Ok(bars.split_off(start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        fs::write(
            path.join("USDJPY_ticks.csv"),
            "timestamp,bid,ask\n\
             1000.0,150.00,150.02\n\
             1002.5,150.10,150.12\n\
             1001.0,150.05,150.07\n",
        )
        .unwrap();
        fs::write(
            path.join("USDJPY_1m.csv"),
            "time,open,high,low,close\n\
             120,150.1,150.3,150.0,150.2\n\
             0,150.0,150.2,149.9,150.1\n\
             60,150.1,150.2,150.0,150.1\n",
        )
        .unwrap();
        fs::write(path.join("EURUSD_ticks.csv"), "timestamp,bid,ask\n").unwrap();
        fs::write(
            path.join("BROKEN_ticks.csv"),
            "timestamp,bid,ask\n1000.0,abc,1.0\n",
        )
        .unwrap();

        (dir, path)
    }

    #[test]
    fn latest_tick_is_newest_by_timestamp() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvFeedAdapter::new(path);

        let tick = adapter.fetch_latest_tick("USDJPY").unwrap().unwrap();
        assert_eq!(tick.timestamp, 1002.5);
        assert_eq!(tick.bid, 150.10);
        assert_eq!(tick.ask, 150.12);
    }

    #[test]
    fn latest_tick_is_none_for_empty_file() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvFeedAdapter::new(path);
        assert_eq!(adapter.fetch_latest_tick("EURUSD").unwrap(), None);
    }

    #[test]
    fn missing_file_is_transient() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvFeedAdapter::new(path);
        let err = adapter.fetch_latest_tick("GBPUSD").unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn malformed_value_is_data_format_error() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvFeedAdapter::new(path);
        let err = adapter.fetch_latest_tick("BROKEN").unwrap_err();
        assert!(matches!(err, TradewindError::DataFormat { .. }));
    }

    #[test]
    fn non_finite_values_are_data_format_errors() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvFeedAdapter::new(path.clone());

        fs::write(
            path.join("NAN_ticks.csv"),
            "timestamp,bid,ask\n10.0,1.0,1.2\nnan,1.0,1.2\n",
        )
        .unwrap();
        let err = adapter.fetch_latest_tick("NAN").unwrap_err();
        assert!(matches!(err, TradewindError::DataFormat { .. }));

        fs::write(
            path.join("NAN_1m.csv"),
            "time,open,high,low,close\n60,1,2,0.5,inf\n",
        )
        .unwrap();
        let err = adapter.fetch_bars("NAN", Timeframe::M1, 10).unwrap_err();
        assert!(matches!(err, TradewindError::DataFormat { .. }));
    }

    #[test]
    fn historical_ticks_filtered_and_sorted() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvFeedAdapter::new(path);

        let ticks = adapter
            .fetch_historical_ticks("USDJPY", 1000.5, 1002.5)
            .unwrap();
        let times: Vec<f64> = ticks.iter().map(|t| t.timestamp).collect();
        assert_eq!(times, vec![1001.0, 1002.5]);
    }

    #[test]
    fn fetch_bars_returns_most_recent_oldest_first() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvFeedAdapter::new(path);

        let bars = adapter.fetch_bars("USDJPY", Timeframe::M1, 2).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].time, 60.0);
        assert_eq!(bars[1].time, 120.0);
        assert_eq!(bars[1].close, 150.2);

        let all = adapter.fetch_bars("USDJPY", Timeframe::M1, 500).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn bar_file_named_by_timeframe_label() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvFeedAdapter::new(path.clone());
        assert!(adapter.fetch_bars("USDJPY", Timeframe::H1, 10).is_err());

        fs::write(
            path.join("USDJPY_1H.csv"),
            "time,open,high,low,close\n3600,1,2,0.5,1.5\n",
        )
        .unwrap();
        let bars = adapter.fetch_bars("USDJPY", Timeframe::H1, 10).unwrap();
        assert_eq!(bars.len(), 1);
    }

    #[test]
    fn appended_ticks_are_seen_on_next_call() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvFeedAdapter::new(path.clone());
        let file = path.join("EURUSD_ticks.csv");
        fs::write(&file, "timestamp,bid,ask\n5.0,1.08,1.09\n").unwrap();
        let tick = adapter.fetch_latest_tick("EURUSD").unwrap().unwrap();
        assert_eq!(tick.timestamp, 5.0);
    }
}
