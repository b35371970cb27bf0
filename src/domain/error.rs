//! Domain error types.

/// Top-level error type for tradewind.
#[derive(Debug, thiserror::Error)]
pub enum TradewindError {
    #[error("feed unavailable: {reason}")]
    FeedUnavailable { reason: String },

    #[error("broker unavailable: {reason}")]
    BrokerUnavailable { reason: String },

    #[error("initialization failed: {reason}")]
    Init { reason: String },

    #[error("order failed: {reason}")]
    OrderFailed { reason: String },

    #[error("malformed data: {reason}")]
    DataFormat { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TradewindError {
    /// True for failures the poll loop treats as "skip this cycle".
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TradewindError::FeedUnavailable { .. } | TradewindError::BrokerUnavailable { .. }
        )
    }

    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        TradewindError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&TradewindError> for std::process::ExitCode {
    fn from(err: &TradewindError) -> Self {
        let code: u8 = match err {
            TradewindError::Io(_) => 1,
            TradewindError::ConfigParse { .. }
            | TradewindError::ConfigMissing { .. }
            | TradewindError::ConfigInvalid { .. } => 2,
            TradewindError::FeedUnavailable { .. } | TradewindError::Init { .. } => 3,
            TradewindError::BrokerUnavailable { .. } | TradewindError::OrderFailed { .. } => 4,
            TradewindError::DataFormat { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
