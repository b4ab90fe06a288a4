use thiserror::Error;

/// Coarse failure classes used by the retry policy and by callers deciding
/// whether a failure degrades a request or aborts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Timeouts, connection resets, 5xx and 429 responses
    Transient,
    /// Malformed requests, auth failures, bad configuration
    Client,
    /// A dependency answered with an unexpected shape
    Parse,
    /// Empty input or vectors of mismatched dimensionality
    DataQuality,
}

#[derive(Error, Debug)]
pub enum PulseRagError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration load error: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("HTTP transport error: {0}")]
    Http(String),

    #[error("{service} API error ({status}): {message}")]
    Api {
        service: String,
        status: u16,
        message: String,
    },

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Content source error: {0}")]
    Source(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Vector dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Product not ready: {0}")]
    ProductNotReady(String),

    #[error("Retries exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        attempts: u32,
        last_error: Box<PulseRagError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Custom(String),
}

impl PulseRagError {
    /// Build an [`PulseRagError::Api`] from a non-success HTTP status
    pub fn api(service: &str, status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            service: service.to_string(),
            status,
            message: message.into(),
        }
    }

    /// Classify this error
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Http(_) | Self::Io(_) => ErrorClass::Transient,
            Self::Api { status, .. } => {
                if *status >= 500 || *status == 429 {
                    ErrorClass::Transient
                } else {
                    ErrorClass::Client
                }
            }
            Self::RetriesExhausted { last_error, .. } => last_error.class(),
            Self::Parse(_) | Self::Json(_) | Self::TomlParsing(_) => ErrorClass::Parse,
            Self::DimensionMismatch { .. } => ErrorClass::DataQuality,
            Self::Config(_)
            | Self::ConfigLoad(_)
            | Self::InvalidArgument(_)
            | Self::ProductNotReady(_) => ErrorClass::Client,
            Self::Embedding(_)
            | Self::Llm(_)
            | Self::VectorStore(_)
            | Self::Source(_)
            | Self::Custom(_) => ErrorClass::Transient,
        }
    }

    /// Whether another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            // Already retried to the ceiling
            Self::RetriesExhausted { .. } => false,
            _ => self.class() == ErrorClass::Transient,
        }
    }

    /// HTTP-like status for the caller-facing fatal error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Api { status, .. } => *status,
            Self::ProductNotReady(_) | Self::InvalidArgument(_) => 400,
            _ => match self.class() {
                ErrorClass::Client => 400,
                ErrorClass::Transient => 503,
                ErrorClass::Parse | ErrorClass::DataQuality => 500,
            },
        }
    }
}

impl From<reqwest::Error> for PulseRagError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::Api {
                service: "http".to_string(),
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => Self::Http(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, PulseRagError>;
