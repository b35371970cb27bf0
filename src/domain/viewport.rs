//! Visible time/price window for the tick chart.
//!
//! X always tracks "now" with a look-ahead margin. Y is centred on the
//! latest price, sized from the recent price range times the zoom factor,
//! and only moves when the desired range breaks out of the current one by
//! more than [`Y_HYSTERESIS`] of the current span.

use crate::domain::tick::Sample;
use std::str::FromStr;

pub const MIN_X_SCALE_SECONDS: f64 = 60.0;
pub const X_ZOOM_STEP_SECONDS: f64 = 60.0;
pub const MIN_Y_ZOOM: f64 = 0.1;
pub const MAX_Y_ZOOM: f64 = 10.0;
pub const Y_ZOOM_IN_FACTOR: f64 = 0.8;
pub const Y_ZOOM_OUT_FACTOR: f64 = 1.2;
/// Fraction of the X scale shown right of "now".
pub const LOOK_AHEAD_RATIO: f64 = 0.3;
/// Samples used to size the Y range.
pub const Y_RANGE_SAMPLES: usize = 100;
/// Floor on the price span when the price is flat.
pub const MIN_PRICE_SPAN: f64 = 0.0001;
pub const Y_HYSTERESIS: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoomAction {
    InX,
    OutX,
    InY,
    OutY,
}

impl FromStr for ZoomAction {
    type Err = String;

    /// `in-x`, `out-x`, `in-y` or `out-y`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in-x" => Ok(ZoomAction::InX),
            "out-x" => Ok(ZoomAction::OutX),
            "in-y" => Ok(ZoomAction::InY),
            "out-y" => Ok(ZoomAction::OutY),
            other => Err(format!(
                "unknown zoom '{other}', expected in-x, out-x, in-y or out-y"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    pub x_scale_seconds: f64,
    pub y_zoom_factor: f64,
    pub x_range: Option<(f64, f64)>,
    pub y_range: Option<(f64, f64)>,
}

#[derive(Debug, Clone)]
pub struct ViewportController {
    state: ViewportState,
}

impl Default for ViewportController {
    fn default() -> Self {
        Self::new(30.0 * 60.0, 1.0)
    }
}

impl ViewportController {
    pub fn new(x_scale_seconds: f64, y_zoom_factor: f64) -> Self {
        Self {
            state: ViewportState {
                x_scale_seconds: x_scale_seconds.max(MIN_X_SCALE_SECONDS),
                y_zoom_factor: y_zoom_factor.clamp(MIN_Y_ZOOM, MAX_Y_ZOOM),
                x_range: None,
                y_range: None,
            },
        }
    }

    pub fn state(&self) -> &ViewportState {
        &self.state
    }

    pub fn zoom_in_x(&mut self) {
        self.state.x_scale_seconds =
            (self.state.x_scale_seconds - X_ZOOM_STEP_SECONDS).max(MIN_X_SCALE_SECONDS);
    }

    pub fn zoom_out_x(&mut self) {
        self.state.x_scale_seconds += X_ZOOM_STEP_SECONDS;
    }

    pub fn zoom_in_y(&mut self) {
        self.state.y_zoom_factor = (self.state.y_zoom_factor * Y_ZOOM_IN_FACTOR).max(MIN_Y_ZOOM);
    }

    pub fn zoom_out_y(&mut self) {
        self.state.y_zoom_factor = (self.state.y_zoom_factor * Y_ZOOM_OUT_FACTOR).min(MAX_Y_ZOOM);
    }

    pub fn apply(&mut self, action: ZoomAction) {
        match action {
            ZoomAction::InX => self.zoom_in_x(),
            ZoomAction::OutX => self.zoom_out_x(),
            ZoomAction::InY => self.zoom_in_y(),
            ZoomAction::OutY => self.zoom_out_y(),
        }
    }

    /// Drop the displayed Y range so the next recompute adopts the
    /// desired range outright.
    pub fn reset_y(&mut self) {
        self.state.y_range = None;
    }

    /// Recompute both ranges from the buffered samples (oldest first).
    /// With no samples the previous state is returned untouched.
    pub fn recompute<'a, I>(&mut self, samples: I, now: f64) -> &ViewportState
    where
        I: IntoIterator<Item = &'a Sample>,
        I::IntoIter: DoubleEndedIterator,
    {
        let recent: Vec<f64> = samples
            .into_iter()
            .rev()
            .take(Y_RANGE_SAMPLES)
            .map(|s| s.value)
            .collect();
        let Some(&latest) = recent.first() else {
            return &self.state;
        };

        let right = now + self.state.x_scale_seconds * LOOK_AHEAD_RATIO;
        self.state.x_range = Some((right - self.state.x_scale_seconds, right));

        let max = recent.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = recent.iter().copied().fold(f64::INFINITY, f64::min);
        let span = (max - min).max(MIN_PRICE_SPAN);
        let half_range = (span / 2.0) * self.state.y_zoom_factor;
        let desired = (latest - half_range, latest + half_range);

        self.state.y_range = Some(match self.state.y_range {
            Some(current) if !breaks_out(desired, current) => current,
            _ => desired,
        });
        &self.state
    }
}

fn breaks_out(desired: (f64, f64), current: (f64, f64)) -> bool {
    let margin = Y_HYSTERESIS * (current.1 - current.0);
    desired.0 < current.0 - margin || desired.1 > current.1 + margin
}
