//! HTTP request generation for MicroChaos
//!
//! One shared `reqwest` client per run, bursts fanned out with
//! `join_all`, cookies and custom headers applied per request,
//! transport failures recorded as sentinel results rather than errors.

pub mod cookies;
pub mod error;
pub mod generator;

pub use cookies::{Cookie, Cookies};
pub use error::{HttpError, HttpResult};
pub use generator::{GeneratorConfig, RequestGenerator};
