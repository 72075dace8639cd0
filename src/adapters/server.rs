use std::{net::SocketAddr, sync::Arc};

use axum::{Router, extract::State, middleware, routing::get};
use eyre::{Result, WrapErr};
use tower_http::trace::TraceLayer;

use crate::{
    adapters::{
        file_system::StaticOrigin,
        http_client::ProxyOrigin,
        http_handler::{EdgeHandler, EdgeOutcome},
        middleware::{
            request_id_middleware, request_timing_middleware, security_headers_middleware,
        },
        robots_route::robots_txt,
    },
    config::models::{EdgeConfig, OriginConfig},
    core::edge::EdgeService,
    ports::origin::Origin,
};

/// Build the origin described by `config.origin`.
pub fn build_origin(config: &EdgeConfig) -> Result<Arc<dyn Origin>> {
    match &config.origin {
        OriginConfig::Static { root } => {
            tracing::info!(root = %root, base_path = %config.base_path, "Serving static site");
            Ok(Arc::new(StaticOrigin::new(root, &config.base_path)))
        }
        OriginConfig::Proxy { target } => {
            let origin = ProxyOrigin::new(target)
                .wrap_err_with(|| format!("Failed to create proxy origin for {target}"))?;
            Ok(Arc::new(origin))
        }
    }
}

async fn edge(State(handler): State<EdgeHandler>, req: axum::extract::Request) -> EdgeOutcome {
    handler.handle(req).await
}

/// Assemble the edge router: `/robots.txt` first, every other request through
/// the edge handler.
pub fn build_router(handler: EdgeHandler) -> Router {
    Router::new()
        .route(
            "/robots.txt",
            get(robots_txt).layer(middleware::from_fn(security_headers_middleware)),
        )
        .fallback(edge)
        .layer(middleware::from_fn(request_timing_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(handler)
}

/// Wire the configured origin and router from `config`.
pub fn build_app(config: Arc<EdgeConfig>) -> Result<Router> {
    let origin = build_origin(&config)?;
    let service = Arc::new(EdgeService::new(config));
    Ok(build_router(EdgeHandler::new(service, origin)))
}

/// Resolve on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to register SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT (Ctrl+C), initiating graceful shutdown..."),
        _ = terminate => tracing::info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}

/// Bind `config.listen_addr` and serve until a shutdown signal arrives.
pub async fn serve(config: Arc<EdgeConfig>) -> Result<()> {
    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .wrap_err("Failed to parse listen address")?;
    let app = build_app(config.clone())?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("Failed to bind to {addr}"))?;

    tracing::info!(
        "canon-edge listening on {} (custom domain: {}, canonical redirect: {})",
        addr,
        config.canonical.custom_domain,
        config.features.canonical_redirect
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("Server error")?;

    tracing::info!("Graceful shutdown completed");
    Ok(())
}
