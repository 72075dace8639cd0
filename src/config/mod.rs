pub mod loader;
pub mod models;
pub mod validation;

pub use loader::{ConfigLoader, DEFAULT_CONFIG_FILE, ENV_PREFIX, load_config};
pub use models::*;
pub use validation::{EdgeConfigValidator, ValidationError, ValidationResult};
