use std::path::{Path, PathBuf};

use async_trait::async_trait;
use axum::{body::Body as AxumBody, http::StatusCode};
use http_body_util::BodyExt;
use hyper::{Request, Response, Uri};
use tower::ServiceExt;
use tower_http::services::ServeDir;

use crate::ports::origin::{Origin, OriginError, OriginResult};

/// Origin serving a built site directory with tower-http `ServeDir`.
///
/// Requests outside `base_path` get a plain 404. Extension-less paths are
/// resolved to `<path>/index.html` or `<path>.html` so that the canonical
/// (slash-less) form of a page is served directly instead of being bounced
/// to a trailing-slash URL.
#[derive(Debug, Clone)]
pub struct StaticOrigin {
    root: PathBuf,
    base_path: String,
    serve_dir: ServeDir,
}

impl StaticOrigin {
    pub fn new(root: impl Into<PathBuf>, base_path: &str) -> Self {
        let root = root.into();
        let serve_dir = ServeDir::new(&root).append_index_html_on_directories(true);
        Self {
            root,
            base_path: base_path.trim_end_matches('/').to_string(),
            serve_dir,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path relative to the site root, or `None` when outside `base_path`.
    fn strip_base<'a>(&self, path: &'a str) -> Option<&'a str> {
        if self.base_path.is_empty() {
            return Some(path);
        }
        match path.strip_prefix(self.base_path.as_str()) {
            Some("") => Some("/"),
            Some(rest) if rest.starts_with('/') => Some(rest),
            _ => None,
        }
    }

    async fn resolve(&self, path: &str) -> String {
        let last_segment = path.rsplit('/').next().unwrap_or_default();
        if path.ends_with('/') || last_segment.contains('.') || path.contains("..") {
            return path.to_string();
        }

        let relative = path.trim_start_matches('/');
        if is_dir(&self.root.join(relative)).await {
            return format!("{path}/");
        }
        if is_file(&self.root.join(format!("{relative}.html"))).await {
            return format!("{path}.html");
        }
        path.to_string()
    }
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .is_ok_and(|metadata| metadata.is_dir())
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .is_ok_and(|metadata| metadata.is_file())
}

fn not_found() -> Response<AxumBody> {
    let mut response = Response::new(AxumBody::from("Not Found"));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}

#[async_trait]
impl Origin for StaticOrigin {
    async fn fetch(&self, req: Request<AxumBody>) -> OriginResult<Response<AxumBody>> {
        let Some(relative) = self.strip_base(req.uri().path()) else {
            tracing::debug!(path = req.uri().path(), base_path = %self.base_path, "Outside base path");
            return Ok(not_found());
        };

        let resolved = self.resolve(relative).await;
        let uri_string = match req.uri().query() {
            Some(query) => format!("{resolved}?{query}"),
            None => resolved,
        };
        let uri = Uri::try_from(uri_string)
            .map_err(|e| OriginError::InvalidRequest(format!("Failed to build file URI: {e}")))?;

        let (mut parts, body) = req.into_parts();
        parts.uri = uri;
        let file_req = Request::from_parts(parts, body);

        let response = self
            .serve_dir
            .clone()
            .oneshot(file_req)
            .await
            .map_err(|e| OriginError::IoError(std::io::Error::other(format!("ServeDir error: {e}"))))?;

        let (parts, file_body) = response.into_parts();
        let axum_body = AxumBody::new(file_body.map_err(|e| {
            tracing::error!("Error reading static file body: {}", e);
            axum::Error::new(e)
        }));

        Ok(Response::from_parts(parts, axum_body))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    async fn create_test_file(dir: &TempDir, path: &str, content: &str) -> std::io::Result<()> {
        let full_path = dir.path().join(path);
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(full_path, content).await
    }

    async fn site() -> TempDir {
        let dir = TempDir::new().unwrap();
        create_test_file(&dir, "index.html", "home").await.unwrap();
        create_test_file(&dir, "style.css", "body {}").await.unwrap();
        create_test_file(&dir, "posts/test/index.html", "post").await.unwrap();
        create_test_file(&dir, "about.html", "about").await.unwrap();
        dir
    }

    async fn fetch(origin: &StaticOrigin, uri: &str) -> (StatusCode, String) {
        let req = Request::builder().uri(uri).body(AxumBody::empty()).unwrap();
        let response = origin.fetch(req).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn serves_files_and_directory_indexes() {
        let dir = site().await;
        let origin = StaticOrigin::new(dir.path(), "/");

        assert_eq!(fetch(&origin, "/").await, (StatusCode::OK, "home".to_string()));
        assert_eq!(
            fetch(&origin, "/style.css").await,
            (StatusCode::OK, "body {}".to_string())
        );
        assert_eq!(fetch(&origin, "/missing.png").await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn slashless_pages_resolve_without_redirect() {
        let dir = site().await;
        let origin = StaticOrigin::new(dir.path(), "/");

        assert_eq!(
            fetch(&origin, "/posts/test?utm_source=x").await,
            (StatusCode::OK, "post".to_string())
        );
        assert_eq!(fetch(&origin, "/about").await, (StatusCode::OK, "about".to_string()));
        assert_eq!(fetch(&origin, "/nowhere").await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn base_path_is_stripped() {
        let dir = site().await;
        let origin = StaticOrigin::new(dir.path(), "/blog/");

        assert_eq!(fetch(&origin, "/blog").await, (StatusCode::OK, "home".to_string()));
        assert_eq!(
            fetch(&origin, "/blog/style.css").await,
            (StatusCode::OK, "body {}".to_string())
        );
        assert_eq!(fetch(&origin, "/style.css").await.0, StatusCode::NOT_FOUND);
        assert_eq!(fetch(&origin, "/blogger/style.css").await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn traversal_stays_inside_root() {
        let dir = site().await;
        let origin = StaticOrigin::new(dir.path().join("posts"), "/");

        assert_ne!(fetch(&origin, "/../about.html").await.0, StatusCode::OK);
    }
}
