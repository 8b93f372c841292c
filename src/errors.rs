use serde::Serialize;

/// Failure taxonomy shared by the adapters, the comparison engine and the HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum QuoteError {
    /// Malformed or out-of-range request field. Raised before any I/O.
    #[error("{0}")]
    Validation(String),
    #[error("Unsupported chain: {chain_id}. Supported: {supported}")]
    UnsupportedChain { chain_id: u64, supported: String },
    /// `decimals()` could not be read; fatal for the quote attempt.
    #[error("Failed to read decimals for token {token} on chain {chain_id}: {reason}")]
    TokenRead {
        chain_id: u64,
        token: String,
        reason: String,
    },
    #[error("No providers returned a successful quote")]
    NoQuote,
    #[error("Curve API not initialized")]
    NotInitialized,
    #[error("{0}")]
    Network(String),
    /// The source is switched off or cannot serve the chain.
    #[error("{0}")]
    Unavailable(String),
    #[error("{0}")]
    Internal(String),
}

/// Serialisable identity of a [`QuoteError`], kept alongside the message in results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    UnsupportedChain,
    TokenRead,
    NoQuote,
    NotInitialized,
    Network,
    Unavailable,
    Internal,
}

impl QuoteError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QuoteError::Validation(_) => ErrorKind::Validation,
            QuoteError::UnsupportedChain { .. } => ErrorKind::UnsupportedChain,
            QuoteError::TokenRead { .. } => ErrorKind::TokenRead,
            QuoteError::NoQuote => ErrorKind::NoQuote,
            QuoteError::NotInitialized => ErrorKind::NotInitialized,
            QuoteError::Network(_) => ErrorKind::Network,
            QuoteError::Unavailable(_) => ErrorKind::Unavailable,
            QuoteError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether the failure belongs to the caller (HTTP 400) rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            QuoteError::Validation(_) | QuoteError::UnsupportedChain { .. }
        )
    }

    pub fn network(err: impl std::fmt::Display) -> Self {
        QuoteError::Network(err.to_string())
    }
}

impl From<anyhow::Error> for QuoteError {
    fn from(err: anyhow::Error) -> Self {
        QuoteError::Network(format!("{:#}", err))
    }
}

/// A failed source: the structured kind plus the message shown to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&QuoteError> for SourceFailure {
    fn from(err: &QuoteError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<QuoteError> for SourceFailure {
    fn from(err: QuoteError) -> Self {
        SourceFailure::from(&err)
    }
}
