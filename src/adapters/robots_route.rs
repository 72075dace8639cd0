use axum::{
    body::Body as AxumBody,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, Uri, header},
};
use eyre::{Result, WrapErr};
use hyper::Response;

use crate::{
    adapters::http_handler::EdgeHandler,
    config::models::RobotsConfig,
    core::{
        edge::request_url,
        robots::{FALLBACK_MAX_AGE, FALLBACK_ROBOTS_TXT, RobotsPolicy},
    },
};

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

fn cache_control(max_age: u64) -> String {
    format!("public, max-age={max_age}")
}

/// `GET /robots.txt`: restrictive for preview hosts, normal otherwise.
pub async fn robots_txt(
    State(handler): State<EdgeHandler>,
    uri: Uri,
    headers: HeaderMap,
) -> Response<AxumBody> {
    match render_robots(&handler.service().config().robots, &uri, &headers) {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(error = %e, "Serving fallback robots.txt");
            fallback_robots_response()
        }
    }
}

fn render_robots(robots: &RobotsConfig, uri: &Uri, headers: &HeaderMap) -> Result<Response<AxumBody>> {
    let url = request_url(uri, headers).wrap_err("Cannot determine robots.txt host")?;
    let host = url.host_str().unwrap_or_default();
    let policy = RobotsPolicy::for_hostname(host);

    tracing::debug!(host, ?policy, "Serving robots.txt");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, TEXT_PLAIN)
        .header(header::CACHE_CONTROL, cache_control(policy.cache_max_age(robots)))
        .body(AxumBody::from(policy.render(robots)))
        .wrap_err("Failed to build robots.txt response")
}

/// The hard-coded allow-all robots.txt.
pub fn fallback_robots_response() -> Response<AxumBody> {
    let mut response = Response::new(AxumBody::from(FALLBACK_ROBOTS_TXT));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
    if let Ok(value) = HeaderValue::from_str(&cache_control(FALLBACK_MAX_AGE)) {
        headers.insert(header::CACHE_CONTROL, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;

    fn headers_for(host: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_str(host).unwrap());
        headers
    }

    async fn body_text(response: Response<AxumBody>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn preview_host_gets_restrictive_policy() {
        let robots = RobotsConfig::default();
        let uri: Uri = "/robots.txt".parse().unwrap();

        let response =
            render_robots(&robots, &uri, &headers_for("astro-notion-blog-cq9.pages.dev")).unwrap();

        assert_eq!(response.headers().get(header::CACHE_CONTROL).unwrap(), "public, max-age=3600");
        assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), TEXT_PLAIN);
        assert!(body_text(response).await.starts_with("User-agent: *\nDisallow: /\n"));
    }

    #[tokio::test]
    async fn canonical_host_gets_normal_policy() {
        let robots = RobotsConfig::default();
        let uri: Uri = "/robots.txt".parse().unwrap();

        let response = render_robots(&robots, &uri, &headers_for("midnight480.com")).unwrap();

        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "public, max-age=86400"
        );
        assert!(body_text(response).await.contains("Crawl-delay: 1"));
    }

    #[tokio::test]
    async fn hostless_request_fails_and_fallback_is_allow_all() {
        let robots = RobotsConfig::default();
        let uri: Uri = "/robots.txt".parse().unwrap();

        assert!(render_robots(&robots, &uri, &HeaderMap::new()).is_err());

        let fallback = fallback_robots_response();
        assert_eq!(fallback.status(), StatusCode::OK);
        assert_eq!(
            fallback.headers().get(header::CACHE_CONTROL).unwrap(),
            "public, max-age=3600"
        );
        assert_eq!(body_text(fallback).await, FALLBACK_ROBOTS_TXT);
    }
}
