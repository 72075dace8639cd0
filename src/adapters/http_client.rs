use async_trait::async_trait;
use axum::body::Body as AxumBody;
use eyre::{Result, WrapErr};
use hyper::{
    Request, Response, Uri, Version,
    header::{self, HeaderMap, HeaderName, HeaderValue},
};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use rustls_native_certs::load_native_certs;
use tracing::Instrument;
use url::Url;

use crate::ports::origin::{Origin, OriginError, OriginResult};

const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

/// Origin forwarding requests to an upstream HTTP server, using Hyper with
/// Rustls (HTTP/1.1, ALPN may negotiate h2).
///
/// The request path and query are appended to the target; the original
/// `Host` is passed on as `X-Forwarded-Host`.
pub struct ProxyOrigin {
    target: Url,
    client: Client<HttpsConnector<HttpConnector>, AxumBody>,
}

impl ProxyOrigin {
    /// Create a proxy origin for `target`, an absolute http(s) URL.
    pub fn new(target: &str) -> Result<Self> {
        let target =
            Url::parse(target).wrap_err_with(|| format!("Invalid proxy target: {target}"))?;
        if !matches!(target.scheme(), "http" | "https") || target.host_str().is_none() {
            eyre::bail!("Proxy target must be an absolute http(s) URL: {target}");
        }

        // Install default crypto provider for rustls if not already set
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let mut http_connector = HttpConnector::new();
        http_connector.enforce_http(false);

        let mut root_cert_store = rustls::RootCertStore::empty();
        let native_certs = load_native_certs();

        for cert in native_certs.certs {
            if root_cert_store.add(cert).is_err() {
                tracing::warn!("Failed to add native certificate to rustls RootCertStore");
            }
        }
        tracing::debug!("Loaded {} native root certificates.", root_cert_store.len());

        if !native_certs.errors.is_empty() {
            tracing::warn!(
                "Some native certificates failed to load: {:?}",
                native_certs.errors
            );
        }

        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_cert_store)
            .with_no_client_auth();

        let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(tls_config)
            .https_or_http()
            .enable_http1()
            .wrap_connector(http_connector);

        let client = Client::builder(TokioExecutor::new()).build::<_, AxumBody>(https_connector);

        tracing::info!(proxy_target = %target, "Created proxy origin");
        Ok(Self { target, client })
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    /// Upstream URI for an inbound request target.
    fn upstream_uri(&self, uri: &Uri) -> OriginResult<Uri> {
        let base = self.target.as_str().trim_end_matches('/');
        let path_and_query = uri.path_and_query().map_or("/", |pq| pq.as_str());

        format!("{base}{path_and_query}")
            .parse()
            .map_err(|e| OriginError::InvalidRequest(format!("Failed to build upstream URI: {e}")))
    }

    /// Point `headers` at the upstream while remembering the original host.
    fn forward_headers(&self, headers: &mut HeaderMap, upstream: &Uri) -> OriginResult<()> {
        if let Some(original_host) = headers.remove(header::HOST) {
            headers.insert(X_FORWARDED_HOST, original_host);
        }
        if !headers.contains_key(&X_FORWARDED_PROTO) {
            headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static("http"));
        }

        let authority = upstream
            .authority()
            .ok_or_else(|| OriginError::InvalidRequest("Upstream URI has no host".to_string()))?;
        let host = HeaderValue::from_str(authority.as_str())
            .map_err(|e| OriginError::InvalidRequest(e.to_string()))?;
        headers.insert(header::HOST, host);
        Ok(())
    }
}

#[async_trait]
impl Origin for ProxyOrigin {
    async fn fetch(&self, req: Request<AxumBody>) -> OriginResult<Response<AxumBody>> {
        let (mut parts, body) = req.into_parts();
        let upstream = self.upstream_uri(&parts.uri)?;
        self.forward_headers(&mut parts.headers, &upstream)?;
        parts.uri = upstream;
        parts.version = Version::HTTP_11;

        let span = tracing::info_span!(
            "origin_request",
            origin.url = %self.target,
            http.method = %parts.method,
            http.path = %parts.uri.path(),
            http.status_code = tracing::field::Empty,
        );

        let method = parts.method.clone();
        let uri = parts.uri.clone();

        let result = self
            .client
            .request(Request::from_parts(parts, body))
            .instrument(span.clone())
            .await;

        match result {
            Ok(response) => {
                span.record("http.status_code", response.status().as_u16());

                let (mut parts, hyper_body) = response.into_parts();
                // Axum re-frames the decoded body.
                parts.headers.remove(header::TRANSFER_ENCODING);

                Ok(Response::from_parts(parts, AxumBody::new(hyper_body)))
            }
            Err(e) => {
                span.record("http.status_code", 599u16);
                tracing::error!("Origin request {} {} failed: {}", method, uri, e);
                Err(OriginError::ConnectionError(format!(
                    "Request to {method} {uri} failed: {e}"
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_non_http_targets() {
        assert!(ProxyOrigin::new("ftp://example.com").is_err());
        assert!(ProxyOrigin::new("not a url").is_err());
        assert!(ProxyOrigin::new("http://127.0.0.1:4321").is_ok());
    }

    #[tokio::test]
    async fn upstream_uri_joins_target_and_request() {
        let origin = ProxyOrigin::new("http://127.0.0.1:4321/").unwrap();
        let uri: Uri = "/posts/test?utm_source=twitter".parse().unwrap();

        assert_eq!(
            origin.upstream_uri(&uri).unwrap().to_string(),
            "http://127.0.0.1:4321/posts/test?utm_source=twitter"
        );
    }

    #[tokio::test]
    async fn original_host_moves_to_forwarded_header() {
        let origin = ProxyOrigin::new("http://127.0.0.1:4321").unwrap();
        let upstream = origin.upstream_uri(&"/".parse().unwrap()).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("midnight480.com"));

        origin.forward_headers(&mut headers, &upstream).unwrap();

        assert_eq!(headers.get(header::HOST).unwrap(), "127.0.0.1:4321");
        assert_eq!(headers.get("x-forwarded-host").unwrap(), "midnight480.com");
        assert_eq!(headers.get("x-forwarded-proto").unwrap(), "http");
    }

    #[tokio::test]
    async fn unreachable_upstream_is_a_connection_error() {
        let origin = ProxyOrigin::new("http://127.0.0.1:1").unwrap();
        let req = Request::builder()
            .uri("/")
            .header(header::HOST, "midnight480.com")
            .body(AxumBody::empty())
            .unwrap();

        let result = origin.fetch(req).await;

        assert!(matches!(result, Err(OriginError::ConnectionError(_))));
    }
}
