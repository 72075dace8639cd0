pub mod canonical;
pub mod domain;
pub mod edge;
pub mod robots;
pub mod seo;

pub use domain::{DomainAnalysis, DomainClassifier};
pub use edge::{CachePolicy, EdgeDecision, EdgeError, EdgeService};
pub use robots::RobotsPolicy;
pub use seo::SeoValidator;
