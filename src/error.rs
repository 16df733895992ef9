//! Error taxonomy for the localization subsystem.
//!
//! Only `LocalizationError` ever reaches UI code, and only from
//! `change_language`. Store and provider failures are recovered inside the
//! crate and surface as log lines.

use thiserror::Error;

/// Failure reading or writing the persisted key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize store contents: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("store contents are corrupt: {0}")]
    Corrupt(String),
}

/// Failure talking to the remote translation provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("failed to send request to translation provider: {0}")]
    Request(#[from] reqwest::Error),

    #[error("translation provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to parse translation provider response: {0}")]
    Parse(String),

    #[error("translation provider response contained no choices")]
    Empty,
}

impl ProviderError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Rate limiting (429) and server errors (5xx) are transient, as are
    /// network and parse failures. Other 4xx responses are not retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Status { status, .. } => *status == 429 || *status >= 500,
            ProviderError::Request(_) | ProviderError::Parse(_) => true,
            ProviderError::Empty => false,
        }
    }
}

/// Errors returned by `LocalizationService::change_language`.
#[derive(Debug, Error)]
pub enum LocalizationError {
    #[error("unsupported language code: '{0}'")]
    UnsupportedLanguage(String),

    #[error("language '{0}' is not enabled")]
    LanguageDisabled(String),

    /// A second language change arrived while one was still running.
    #[error("cannot switch to '{0}': another language change is already in progress")]
    LanguageChangeInProgress(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}
