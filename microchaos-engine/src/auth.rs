//! Session establishment for authenticated runs

use async_trait::async_trait;
use microchaos_http::Cookie;
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid auth spec '{0}', expected user or user@host")]
    InvalidSpec(String),

    #[error("failed to build auth client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("login request for '{user}' failed: {source}")]
    Request {
        user: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("login for '{user}' was denied with status {status}")]
    Denied { user: String, status: u16 },
}

/// Turns a user spec from the CLI into a session cookie set.
///
/// Single-auth runs treat a failure here as fatal; multi-auth runs
/// skip the failing user and continue with whoever logged in.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn session_for(&self, user_spec: &str) -> Result<Vec<Cookie>, AuthError>;
}

/// Logs in with HTTP Basic credentials against the target base URL and
/// harvests whatever session cookies the application sets.
///
/// The user spec is `user` or `user@host`; the host part is
/// informational since every request goes to the configured base URL.
pub struct BasicAuthProvider {
    client: reqwest::Client,
    base_url: Url,
    password: String,
}

impl BasicAuthProvider {
    pub fn new(base_url: Url, password: impl Into<String>) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(AuthError::Client)?;
        Ok(Self {
            client,
            base_url,
            password: password.into(),
        })
    }

    fn username_of(user_spec: &str) -> Result<&str, AuthError> {
        let username = user_spec.split('@').next().unwrap_or("").trim();
        if username.is_empty() {
            return Err(AuthError::InvalidSpec(user_spec.to_string()));
        }
        Ok(username)
    }
}

#[async_trait]
impl SessionProvider for BasicAuthProvider {
    async fn session_for(&self, user_spec: &str) -> Result<Vec<Cookie>, AuthError> {
        let username = Self::username_of(user_spec)?;
        let response = self
            .client
            .get(self.base_url.clone())
            .basic_auth(username, Some(&self.password))
            .send()
            .await
            .map_err(|source| AuthError::Request {
                user: user_spec.to_string(),
                source,
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(AuthError::Denied {
                user: user_spec.to_string(),
                status: status.as_u16(),
            });
        }

        let cookies: Vec<Cookie> = response
            .headers()
            .get_all(reqwest::header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|raw| {
                let pair = raw.split(';').next()?;
                let (name, value) = pair.split_once('=')?;
                Some(Cookie::new(name.trim(), value.trim()))
            })
            .collect();
        debug!(user = username, cookies = cookies.len(), "session established");
        Ok(cookies)
    }
}
