//! Crate-wide error type.
//!
//! Validation errors never retry, orchestration-API errors retry with
//! backoff, provider and hook errors are bounded-retry, conversion and
//! serialization errors are terminal for the operation that hit them.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("storage provider error: {0}")]
    Provider(String),

    #[error("hook execution error: {0}")]
    Hook(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("version conversion error: {0}")]
    Conversion(String),

    #[error("finalizer error: {0}")]
    Finalizer(#[from] Box<kube::runtime::finalizer::Error<Error>>),

    #[error("operation timed out: {0}")]
    Timeout(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("encryption error: {0}")]
    Encryption(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classifies an error as transient (worth an unbounded/backoff retry)
    /// vs terminal (surfaced to the user, no automatic retry). Mirrors the
    /// `error_policy` split the reconciler uses to pick its requeue delay.
    pub fn is_retriable(&self) -> bool {
        match self {
            Error::Kube(kube::Error::Api(e)) => {
                // Conflict (optimistic concurrency) and server timeouts are
                // transient; admission rejections of a malformed object are not.
                e.code == 409 || e.code == 429 || e.code >= 500
            }
            Error::Kube(_) => true,
            Error::Provider(_) => true,
            Error::Timeout(_) => true,
            Error::Validation(_) => false,
            Error::Config(_) => false,
            Error::Conversion(_) => false,
            Error::Encryption(_) => false,
            Error::Hook(_) => false,
            Error::Serialization(_) | Error::Yaml(_) => false,
            Error::Finalizer(_) => true,
            Error::NotFound(_) => false,
            Error::Io(_) => true,
        }
    }
}

impl From<kube::runtime::finalizer::Error<Error>> for Error {
    fn from(e: kube::runtime::finalizer::Error<Error>) -> Self {
        Error::Finalizer(Box::new(e))
    }
}
