use thiserror::Error;

/// Failures surfaced at the operation boundaries (fetch, extract,
/// synthesize, save). Each maps to one user-facing message in the CLI.
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("failed to fetch {url}: HTTP {status}")]
    Fetch { url: String, status: u16 },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("could not extract article content from this URL")]
    Extraction,

    #[error("speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("summarization failed: {0}")]
    Summarization(String),

    #[error("invalid API key: {0}")]
    CredentialInvalid(String),

    #[error("failed to save article: {0}")]
    Persistence(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Store(#[from] sled::Error),
}

pub type Result<T> = std::result::Result<T, ReaderError>;
