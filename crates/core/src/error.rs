use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("Unexpected status {status} from {url}: {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
    },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed captions at line {line}: {reason}")]
    MalformedCaptions { line: usize, reason: String },

    #[error("Invalid alias table override in {source_name}: {reason}")]
    InvalidAliasTable { source_name: String, reason: String },

    #[error("No asset origin configured; pass --origin or set MICROREEL_API_BASE")]
    MissingOrigin,
}

impl MediaError {
    pub fn transport(url: impl Into<String>, reason: impl Into<String>) -> Self {
        MediaError::Transport {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MediaError>;
