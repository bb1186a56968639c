//! Test configuration for MicroChaos load tests
//!
//! A `TestConfig` is built once at the CLI boundary, validated, and never
//! mutated afterward. Endpoint slugs and body sources are resolved into
//! concrete values during orchestration startup, before any request fires.

pub mod body;
pub mod endpoint;
pub mod error;
pub mod method;
pub mod test_config;
pub mod validation;

pub use body::BodySource;
pub use endpoint::{resolve_endpoint, Endpoint, RotationMode};
pub use error::{ConfigError, ConfigResult};
pub use method::HttpMethod;
pub use test_config::{parse_pair_list, AuthSpec, TestConfig};
pub use validation::Validatable;
