//! Error types shared across payment drivers.

/// Crate-wide Result type
pub type PaymentResult<T> = std::result::Result<T, PaymentError>;

/// Main payment error type
///
/// Gateway rejections, user cancellation and transport faults are distinct
/// variants so callers can react to each without parsing messages.
#[derive(thiserror::Error, Debug)]
pub enum PaymentError {
    /// The gateway rejected the purchase request. Carries the gateway's
    /// localized message.
    #[error("{0}")]
    PurchaseFailed(String),

    /// Verification did not succeed. `status_code` is `None` when the payer
    /// cancelled on the hosted page and `Some(code)` when the gateway
    /// rejected the verification call.
    #[error("{message}")]
    InvalidPayment {
        message: String,
        status_code: Option<i32>,
    },

    /// Precondition violations (e.g. `pay()` before a successful purchase)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// HTTP client errors
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed or unparseable gateway response
    #[error("Malformed gateway response: {0}")]
    Xml(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other transport-level failures (non-2xx responses, exhausted retries)
    #[error("Transport error: {0}")]
    Transport(String),
}

impl PaymentError {
    pub fn validation(msg: impl Into<String>) -> Self {
        PaymentError::Validation(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        PaymentError::Configuration(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        PaymentError::Transport(msg.into())
    }

    /// True when the payer aborted the payment on the hosted page.
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            PaymentError::InvalidPayment {
                status_code: None,
                ..
            }
        )
    }
}
