//! Exponential Moving Average.
//!
//! k = 2/(n+1), seeded with the first close, then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! No warmup: every point is valid.

use crate::domain::indicator::{
    IndicatorKind, IndicatorPoint, IndicatorSeries, IndicatorSpec, IndicatorValue,
};
use crate::domain::ohlcv::Bar;

pub fn calculate_ema(bars: &[Bar], period: usize) -> IndicatorSeries {
    let spec = IndicatorSpec {
        kind: IndicatorKind::Ema,
        period,
        ..IndicatorSpec::default()
    };
    if period == 0 || bars.is_empty() {
        return IndicatorSeries {
            spec,
            values: Vec::new(),
        };
    }

    let mut values = Vec::with_capacity(bars.len());
    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = bars[0].close;

    for (i, bar) in bars.iter().enumerate() {
        if i > 0 {
            ema = bar.close * k + ema * (1.0 - k);
        }
        values.push(IndicatorPoint {
            time: bar.time,
            valid: true,
            value: IndicatorValue::Simple(ema),
        });
    }

    IndicatorSeries { spec, values }
}
