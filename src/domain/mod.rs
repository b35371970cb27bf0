//! Core domain types and logic.

pub mod bar_series;
pub mod config;
pub mod config_validation;
pub mod dashboard;
pub mod error;
pub mod indicator;
pub mod ohlcv;
pub mod position;
pub mod position_tracker;
pub mod tick;
pub mod timeframe;
pub mod timeseries;
pub mod viewport;
