//! Engine error types

use crate::auth::AuthError;
use microchaos_config::ConfigError;
use microchaos_http::HttpError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),
}

pub type EngineResult<T> = Result<T, EngineError>;
