use crate::provider::FetchError;
use thiserror::Error;

/// Top-level error type for the correlation pipeline.
#[derive(Error, Debug)]
pub enum CorrelatorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Upstream fetch error: {0}")]
    UpstreamFetch(#[from] FetchError),

    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),
}
