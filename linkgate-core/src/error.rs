use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    #[error("Unsafe webhook URL: {0}")]
    UnsafeWebhookUrl(String),

    #[error("Webhook queue full")]
    QueueFull,

    #[error("Store error: {0}")]
    Store(String),

    #[error("Evaluation timed out")]
    EvaluationTimeout,

    #[error("Evaluation panicked")]
    EvaluationPanic,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns a stable error code for this error variant.
    /// These codes are stable and can be used by callers for error classification.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidRule(_) => "INVALID_RULE",
            Error::UnsafeWebhookUrl(_) => "UNSAFE_WEBHOOK_URL",
            Error::QueueFull => "QUEUE_FULL",
            Error::Store(_) => "STORE_ERROR",
            Error::EvaluationTimeout => "EVALUATION_TIMEOUT",
            Error::EvaluationPanic => "EVALUATION_PANIC",
            Error::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns true if the orchestrator converts this error into the
    /// fail-open default redirect instead of surfacing it.
    ///
    /// Faults inside evaluation or the store degrade toward availability:
    /// the visitor still reaches the destination. Authoring and webhook
    /// errors are never on the redirect path, so they do not fail open.
    pub fn fails_open(&self) -> bool {
        match self {
            Error::EvaluationTimeout => true,
            Error::EvaluationPanic => true,
            Error::Store(_) => true,
            Error::Internal(_) => true,

            Error::InvalidRule(_) => false,
            Error::UnsafeWebhookUrl(_) => false,
            Error::QueueFull => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// The single generic denial returned by deferred gate verification.
///
/// Wrong secret, missing/disabled link, and "not password-gated" all
/// collapse into this one value so callers cannot enumerate which case
/// they hit. Causes are distinguished only in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Denied;

impl std::fmt::Display for Denied {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("access denied")
    }
}

impl std::error::Error for Denied {}
