use log::error;

use crate::errors::QuoteError;

/// Crash collector notified of every server-side (5xx) failure.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, context: &str, error: &QuoteError);
}

/// Default collector: the error log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, context: &str, err: &QuoteError) {
        error!("{} [{:?}]: {}", context, err.kind(), err);
    }
}
