// Integration tests driving the full edge router against a static site
#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode, header},
        response::Response,
    };
    use canon_edge::{
        adapters::build_app,
        config::EdgeConfig,
        core::{edge::CACHE_STATIC, robots::FALLBACK_ROBOTS_TXT},
    };
    use http_body_util::BodyExt;
    use tempfile::TempDir;
    use tower::ServiceExt; // for oneshot

    const PREVIEW_HOST: &str = "astro-notion-blog-cq9.pages.dev";
    const CUSTOM_HOST: &str = "midnight480.com";

    async fn create_test_file(dir: &TempDir, path: &str, content: &str) {
        let full_path = dir.path().join(path);
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await.unwrap();
        }
        tokio::fs::write(full_path, content).await.unwrap();
    }

    async fn site() -> TempDir {
        let dir = TempDir::new().unwrap();
        create_test_file(&dir, "index.html", "<h1>home</h1>").await;
        create_test_file(&dir, "style.css", "body {}").await;
        create_test_file(&dir, "posts/test/index.html", "<h1>post</h1>").await;
        create_test_file(&dir, "sitemap.xml", "<urlset/>").await;
        dir
    }

    fn app_for(dir: &TempDir, config: EdgeConfig) -> Router {
        let config = EdgeConfig {
            origin: EdgeConfig::builder()
                .static_root(dir.path().to_str().unwrap())
                .build()
                .origin,
            ..config
        };
        build_app(Arc::new(config)).unwrap()
    }

    fn request(method: &str, host: Option<&str>, uri: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-proto", "https");
        if let Some(host) = host {
            builder = builder.header(header::HOST, host);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn send(app: &Router, req: Request<Body>) -> Response {
        app.clone().oneshot(req).await.unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn preview_host_redirects_to_custom_domain() {
        let dir = site().await;
        let app = app_for(&dir, EdgeConfig::default());

        let response = send(
            &app,
            request("GET", Some(PREVIEW_HOST), "/posts/test?utm_source=twitter"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "https://midnight480.com/posts/test?utm_source=twitter"
        );
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn absolute_form_uri_without_host_header_redirects() {
        let dir = site().await;
        let app = app_for(&dir, EdgeConfig::default());

        let response = send(
            &app,
            request("GET", None, "https://astro-notion-blog-cq9.pages.dev/about"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "https://midnight480.com/about"
        );
    }

    #[tokio::test]
    async fn static_asset_on_custom_domain_is_cached_for_a_year() {
        let dir = site().await;
        let app = app_for(&dir, EdgeConfig::default());

        let response = send(&app, request("GET", Some(CUSTOM_HOST), "/style.css")).await;

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers.get(header::CACHE_CONTROL).unwrap(), CACHE_STATIC);
        assert_eq!(headers.get(header::X_FRAME_OPTIONS).unwrap(), "DENY");
        assert_eq!(headers.get(header::X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
        assert_eq!(headers.get("x-robots-tag").unwrap(), "noai, noimageai");
        assert!(headers.get(header::LOCATION).is_none());
    }

    #[tokio::test]
    async fn pages_and_sitemaps_get_short_cache() {
        let dir = site().await;
        let app = app_for(&dir, EdgeConfig::default());

        let page = send(&app, request("GET", Some("www.midnight480.com"), "/posts/test")).await;
        assert_eq!(page.status(), StatusCode::OK);
        assert_eq!(
            page.headers().get(header::CACHE_CONTROL).unwrap(),
            "public, max-age=3600"
        );
        assert_eq!(body_text(page).await, "<h1>post</h1>");

        let sitemap = send(&app, request("GET", Some(CUSTOM_HOST), "/sitemap.xml")).await;
        assert_eq!(
            sitemap.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/xml"
        );
        assert_eq!(
            sitemap.headers().get(header::CACHE_CONTROL).unwrap(),
            "public, max-age=3600"
        );
    }

    #[tokio::test]
    async fn missing_pages_are_decorated_not_found() {
        let dir = site().await;
        let app = app_for(&dir, EdgeConfig::default());

        let response = send(&app, request("GET", Some(CUSTOM_HOST), "/nope")).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers().get(header::X_FRAME_OPTIONS).unwrap(), "DENY");
    }

    #[tokio::test]
    async fn hostless_request_is_served_undecorated() {
        let dir = site().await;
        let app = app_for(&dir, EdgeConfig::default());

        let response = send(&app, request("GET", None, "/style.css")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::X_FRAME_OPTIONS).is_none());
        assert!(response.headers().get(header::CACHE_CONTROL).is_none());
        assert_eq!(body_text(response).await, "body {}");
    }

    #[tokio::test]
    async fn redirect_kill_switch_serves_preview_host() {
        let dir = site().await;
        let app = app_for(&dir, EdgeConfig::builder().canonical_redirect(false).build());

        let response = send(&app, request("GET", Some(PREVIEW_HOST), "/")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "<h1>home</h1>");
    }

    #[tokio::test]
    async fn robots_txt_is_restrictive_on_preview_host() {
        let dir = site().await;
        let app = app_for(&dir, EdgeConfig::default());

        let response = send(&app, request("GET", Some(PREVIEW_HOST), "/robots.txt")).await;

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(
            headers.get(header::CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
        assert_eq!(headers.get(header::CACHE_CONTROL).unwrap(), "public, max-age=3600");
        assert_eq!(headers.get(header::X_FRAME_OPTIONS).unwrap(), "DENY");

        let body = body_text(response).await;
        assert!(body.starts_with("User-agent: *\nDisallow: /\n"));
        assert!(body.contains("# Please visit: https://midnight480.com"));
        assert!(!body.contains("User-agent: Googlebot"));
    }

    #[tokio::test]
    async fn robots_txt_is_normal_on_custom_domain() {
        let dir = site().await;
        let app = app_for(&dir, EdgeConfig::default());

        let response = send(&app, request("GET", Some(CUSTOM_HOST), "/robots.txt")).await;

        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "public, max-age=86400"
        );
        let body = body_text(response).await;
        assert!(body.starts_with("User-agent: *\nAllow: /\n"));
        assert!(body.contains("User-agent: GPTBot\nDisallow: /"));
        assert!(body.ends_with("Sitemap: https://midnight480.com/sitemap.xml"));
    }

    #[tokio::test]
    async fn robots_txt_without_host_falls_back() {
        let dir = site().await;
        let app = app_for(&dir, EdgeConfig::default());

        let response = send(&app, request("GET", None, "/robots.txt")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, FALLBACK_ROBOTS_TXT);
    }

    #[tokio::test]
    async fn robots_txt_rejects_other_methods() {
        let dir = site().await;
        let app = app_for(&dir, EdgeConfig::default());

        let response = send(&app, request("POST", Some(CUSTOM_HOST), "/robots.txt")).await;

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn oversized_request_body_gets_413() {
        let dir = site().await;
        let app = app_for(&dir, EdgeConfig::builder().max_body_bytes(16).build());

        let req = Request::builder()
            .method("POST")
            .uri("/x")
            .header(header::HOST, CUSTOM_HOST)
            .body(Body::from(vec![0u8; 4096]))
            .unwrap();
        let response = send(&app, req).await;

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn custom_domain_is_configurable() {
        let dir = site().await;
        let app = app_for(&dir, EdgeConfig::builder().custom_domain("example.org").build());

        let redirect = send(&app, request("GET", Some(PREVIEW_HOST), "/posts/test")).await;
        assert_eq!(
            redirect.headers().get(header::LOCATION).unwrap(),
            "https://example.org/posts/test"
        );

        let robots = send(&app, request("GET", Some(PREVIEW_HOST), "/robots.txt")).await;
        assert!(body_text(robots).await.ends_with("Sitemap: https://example.org/sitemap.xml"));
    }
}
