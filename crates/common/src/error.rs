use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Market data could not be fetched (network, rate limit, unknown symbol).
    #[error("Market data error: {0}")]
    DataFetch(String),

    #[error("Chart render error: {0}")]
    Render(String),

    /// The vision model call failed or returned no text.
    #[error("Classification error: {0}")]
    Classification(String),

    /// The model response is not a decodable decision object.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The decision decoded but its numeric fields are unusable.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Dispatch error: {0}")]
    Dispatch(String),

    #[error("Timed out after {secs}s: {what}")]
    Timeout { what: String, secs: u64 },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Short stable label used in log fields and decision records.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::DataFetch(_) => "data_fetch",
            Error::Render(_) => "render",
            Error::Classification(_) => "classification",
            Error::Parse(_) => "parse",
            Error::Validation(_) => "validation",
            Error::Dispatch(_) => "dispatch",
            Error::Timeout { .. } => "timeout",
            Error::Http(_) => "http",
            Error::Json(_) => "json",
            Error::Config(_) => "config",
            Error::Io(_) => "io",
            Error::Other(_) => "other",
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
