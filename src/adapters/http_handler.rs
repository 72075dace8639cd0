use std::sync::Arc;

use axum::{
    body::Body as AxumBody,
    http::{StatusCode, header, request::Parts},
    response::IntoResponse,
};
use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::{Request, Response};

use crate::{
    core::edge::{EdgeDecision, EdgeError, EdgeService, apply_security_headers, request_url},
    ports::origin::Origin,
};

/// Result of driving one request through the edge.
#[derive(Debug)]
pub enum EdgeOutcome {
    /// Redirected, or forwarded and decorated
    Success(Response<AxumBody>),
    /// Edge processing failed; the origin answered the undecorated retry
    Degraded {
        response: Response<AxumBody>,
        cause: EdgeError,
    },
    /// Both the edge path and the retry failed
    Failed {
        cause: EdgeError,
        fallback: Response<AxumBody>,
    },
}

impl EdgeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, EdgeOutcome::Success(_))
    }

    pub fn cause(&self) -> Option<&EdgeError> {
        match self {
            EdgeOutcome::Success(_) => None,
            EdgeOutcome::Degraded { cause, .. } | EdgeOutcome::Failed { cause, .. } => Some(cause),
        }
    }

    pub fn response(&self) -> &Response<AxumBody> {
        match self {
            EdgeOutcome::Success(response) | EdgeOutcome::Degraded { response, .. } => response,
            EdgeOutcome::Failed { fallback, .. } => fallback,
        }
    }
}

impl IntoResponse for EdgeOutcome {
    fn into_response(self) -> axum::response::Response {
        match self {
            EdgeOutcome::Success(response) | EdgeOutcome::Degraded { response, .. } => response,
            EdgeOutcome::Failed { fallback, .. } => fallback,
        }
    }
}

/// 413 for bodies over `max_body_bytes`, with the security headers.
pub fn payload_too_large_response() -> Response<AxumBody> {
    let mut response = Response::new(AxumBody::from("Payload Too Large"));
    *response.status_mut() = StatusCode::PAYLOAD_TOO_LARGE;
    apply_security_headers(response.headers_mut());
    response
}

/// Fixed 500 carrying only the security headers.
pub fn internal_error_response() -> Response<AxumBody> {
    let mut response = Response::new(AxumBody::from("Internal Server Error"));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    apply_security_headers(response.headers_mut());
    response
}

fn redirect_response(location: &url::Url) -> Result<Response<AxumBody>, EdgeError> {
    Response::builder()
        .status(StatusCode::MOVED_PERMANENTLY)
        .header(header::LOCATION, location.as_str())
        .body(AxumBody::empty())
        .map_err(|e| EdgeError::InvalidRedirect(e.to_string()))
}

/// Rebuild the original request from its head and buffered body.
fn replay(parts: &Parts, body: &Bytes) -> Request<AxumBody> {
    let mut req = Request::new(AxumBody::from(body.clone()));
    *req.method_mut() = parts.method.clone();
    *req.uri_mut() = parts.uri.clone();
    *req.version_mut() = parts.version;
    *req.headers_mut() = parts.headers.clone();
    req
}

/// Request entry point: classify, then redirect or forward and decorate.
pub struct EdgeHandler {
    service: Arc<EdgeService>,
    origin: Arc<dyn Origin>,
}

impl EdgeHandler {
    pub fn new(service: Arc<EdgeService>, origin: Arc<dyn Origin>) -> Self {
        Self { service, origin }
    }

    pub fn service(&self) -> &EdgeService {
        &self.service
    }

    pub async fn handle(&self, req: Request<AxumBody>) -> EdgeOutcome {
        let (parts, body) = req.into_parts();

        // Without the body the request cannot be replayed, so there is no retry.
        let limit = self.service.config().max_body_bytes;
        let body = match Limited::new(body, limit).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
                let cause = EdgeError::BodyTooLarge { limit };
                tracing::warn!(error = %cause, uri = %parts.uri, "Rejecting oversized request body");
                return EdgeOutcome::Failed {
                    cause,
                    fallback: payload_too_large_response(),
                };
            }
            Err(e) => {
                let cause = EdgeError::Body(e.to_string());
                tracing::error!(error = %cause, "Failed to buffer request body");
                return EdgeOutcome::Failed {
                    cause,
                    fallback: internal_error_response(),
                };
            }
        };

        match self.process(&parts, &body).await {
            Ok(response) => EdgeOutcome::Success(response),
            Err(cause) => self.fail_safe(&parts, &body, cause).await,
        }
    }

    async fn process(&self, parts: &Parts, body: &Bytes) -> Result<Response<AxumBody>, EdgeError> {
        let url = request_url(&parts.uri, &parts.headers)?;

        match self.service.decide(&url)? {
            EdgeDecision::Redirect { analysis, location } => {
                tracing::info!(
                    host = %analysis.hostname,
                    location = %location,
                    "Redirecting to canonical domain"
                );
                redirect_response(&location)
            }
            EdgeDecision::Forward { analysis } => {
                tracing::debug!(
                    host = %analysis.hostname,
                    custom_domain = analysis.is_custom_domain,
                    path = url.path(),
                    "Forwarding to origin"
                );
                let mut response = self.origin.fetch(replay(parts, body)).await?;
                self.service.decorate(url.path(), response.headers_mut());
                Ok(response)
            }
        }
    }

    async fn fail_safe(&self, parts: &Parts, body: &Bytes, cause: EdgeError) -> EdgeOutcome {
        tracing::warn!(
            error = %cause,
            uri = %parts.uri,
            "Edge processing failed, forwarding without decoration"
        );

        match self.origin.fetch(replay(parts, body)).await {
            Ok(response) => EdgeOutcome::Degraded { response, cause },
            Err(retry) => {
                tracing::error!(
                    error = %cause,
                    retry_error = %retry,
                    uri = %parts.uri,
                    "Fallback forward failed"
                );
                EdgeOutcome::Failed {
                    cause,
                    fallback: internal_error_response(),
                }
            }
        }
    }
}

impl Clone for EdgeHandler {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            origin: self.origin.clone(),
        }
    }
}
