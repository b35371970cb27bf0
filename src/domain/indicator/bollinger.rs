//! Bollinger Bands.
//!
//! - Middle: SMA over n periods
//! - Upper: Middle + (deviation × StdDev)
//! - Lower: Middle - (deviation × StdDev)
//!
//! StdDev is the sample standard deviation (divides by n-1), so the bands
//! are undefined for period 1. Warmup: first (period-1) bars are invalid.

use crate::domain::indicator::stddev::mean_and_sample_stddev;
use crate::domain::indicator::{
    IndicatorKind, IndicatorPoint, IndicatorSeries, IndicatorSpec, IndicatorValue,
};
use crate::domain::ohlcv::Bar;

pub fn calculate_bollinger(bars: &[Bar], period: usize, deviation: f64) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        let stats = if period >= 2 && i + 1 >= period {
            mean_and_sample_stddev(&bars[i + 1 - period..=i])
        } else {
            None
        };

        let (valid, value) = match stats {
            Some((middle, stddev)) => {
                let half_width = deviation * stddev;
                (
                    true,
                    IndicatorValue::Bollinger {
                        upper: middle + half_width,
                        middle,
                        lower: middle - half_width,
                    },
                )
            }
            None => (
                false,
                IndicatorValue::Bollinger {
                    upper: 0.0,
                    middle: 0.0,
                    lower: 0.0,
                },
            ),
        };

        values.push(IndicatorPoint {
            time: bar.time,
            valid,
            value,
        });
    }

    IndicatorSeries {
        spec: IndicatorSpec {
            kind: IndicatorKind::Bollinger,
            period,
            deviation,
        },
        values,
    }
}
