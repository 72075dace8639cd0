//! canon-edge - edge request canonicalization for a statically generated blog.
//!
//! Every request passes through a small, stateless edge layer before it
//! reaches the built site:
//!
//! - requests arriving on the hosting platform's preview hostname
//!   (`*.pages.dev`) are answered with a permanent redirect to the custom
//!   domain, path and query untouched
//! - everything else is forwarded to the origin (a static directory or an
//!   upstream server) and decorated with security and cache headers
//! - `/robots.txt` is rendered per hostname: allow-listed on the custom
//!   domain, locked down on preview hostnames
//!
//! The same building blocks produce canonical URLs for `<link rel="canonical">`
//! tags and power an offline SEO audit ([`core::seo::SeoValidator`]).
//!
//! # Quick Example
//! ```no_run
//! use std::sync::Arc;
//!
//! use canon_edge::config::{EdgeConfigValidator, load_config};
//!
//! # #[tokio::main] async fn main() -> eyre::Result<()> {
//! let config = load_config(Some("canon-edge.toml"))?;
//! EdgeConfigValidator::validate(&config)?;
//! canon_edge::adapters::serve(Arc::new(config)).await?;
//! # Ok(()) }
//! ```
//!
//! # Architecture
//! Pure decisions live in `core`, the origin seam is a trait in `ports`, and
//! `adapters` wire them into axum. Configuration is read once at startup and
//! shared read-only behind an `Arc`.
//!
//! # Error Handling
//! Component errors are typed (`thiserror`); application code propagates
//! `eyre::Result<T>` with `WrapErr` context. A failing request never surfaces
//! an error to the client: the edge handler falls back to an undecorated
//! forward, then to a fixed 500.
pub mod config;
pub mod ports;
pub mod tracing_setup;

pub mod adapters;
pub mod core;

// Re-export the specific types needed by the binary crate
pub use crate::{
    adapters::{EdgeHandler, EdgeOutcome, ProxyOrigin, StaticOrigin},
    config::EdgeConfig,
    core::{DomainClassifier, EdgeService, SeoValidator},
    ports::Origin,
};
