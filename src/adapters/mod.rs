pub mod file_system;
pub mod http_client;
pub mod http_handler;
pub mod middleware;
pub mod robots_route;
pub mod server;

/// Re-export commonly used types from adapters
pub use file_system::StaticOrigin;
pub use http_client::ProxyOrigin;
pub use http_handler::{EdgeHandler, EdgeOutcome};
pub use server::{build_app, build_origin, build_router, serve};
