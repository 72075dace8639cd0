use async_trait::async_trait;
use axum::body::Body as AxumBody;
use hyper::{Request, Response};
use thiserror::Error;

/// Error type for origin fetches
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum OriginError {
    /// Error when the upstream origin cannot be reached
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error when the forwarded request cannot be built
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Error when reading from the local site directory
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias for origin fetches
pub type OriginResult<T> = Result<T, OriginError>;

/// Origin defines the port (interface) for resolving forwarded requests into
/// a base response (static assets, rendered pages, feeds).
///
/// Non-success HTTP statuses such as 404 are regular responses, not errors.
/// An `Err` means no response could be produced at all.
#[async_trait]
pub trait Origin: Send + Sync + 'static {
    /// Resolve `req` into the base response
    async fn fetch(&self, req: Request<AxumBody>) -> OriginResult<Response<AxumBody>>;
}
