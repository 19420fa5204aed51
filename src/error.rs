use thiserror::Error;

/// Unified error type for the entire DNS filtering proxy.
#[derive(Debug, Error)]
pub enum FirewallError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("domain already exists: {domain} ({source:?}/{list_type:?})")]
    Conflict {
        domain: String,
        list_type: crate::model::ListType,
        source: crate::model::ListSource,
    },

    #[error("domain not found: {0}")]
    NotFound(String),

    #[error("invalid domain name: {0}")]
    InvalidDomain(String),

    #[error("upstream request timed out")]
    UpstreamTimeout,

    #[error("upstream socket error: {0}")]
    Upstream(String),

    #[error("invalid DNS packet: {0}")]
    ParseError(String),

    #[error("classification queue is full")]
    QueueFull,

    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("password hashing error: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, FirewallError>;
