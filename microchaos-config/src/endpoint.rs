//! Endpoint slug resolution and rotation modes

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// A resolved test endpoint: the slug it was configured as plus the
/// absolute URL requests will hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub slug: String,
    pub url: Url,
}

/// Policy for choosing among multiple endpoints per request slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RotationMode {
    /// Round-robin with a persistent index shared across bursts
    #[default]
    Serial,
    /// Uniform random pick per slot, with replacement
    Random,
}

impl fmt::Display for RotationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RotationMode::Serial => f.write_str("serial"),
            RotationMode::Random => f.write_str("random"),
        }
    }
}

impl FromStr for RotationMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "serial" => Ok(RotationMode::Serial),
            "random" => Ok(RotationMode::Random),
            other => Err(ConfigError::DomainError {
                domain: "target".to_string(),
                message: format!("rotation_mode must be 'serial' or 'random', got '{}'", other),
            }),
        }
    }
}

/// Resolve an endpoint slug to an absolute URL against the target base.
///
/// Known slugs map to well-known paths; `custom:<path>` takes an
/// arbitrary relative path. Unknown slugs are an error, not a panic.
pub fn resolve_endpoint(base: &Url, slug: &str) -> ConfigResult<Endpoint> {
    let path = if let Some(custom) = slug.strip_prefix("custom:") {
        custom.to_string()
    } else {
        match slug {
            "home" => "/".to_string(),
            "shop" => "/shop/".to_string(),
            "cart" => "/cart/".to_string(),
            "checkout" => "/checkout/".to_string(),
            _ => return Err(ConfigError::InvalidEndpoint(slug.to_string())),
        }
    };

    let url = base.join(&path)?;
    Ok(Endpoint {
        slug: slug.to_string(),
        url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://staging.example.com").unwrap()
    }

    #[test]
    fn test_known_slugs() {
        let home = resolve_endpoint(&base(), "home").unwrap();
        assert_eq!(home.url.as_str(), "https://staging.example.com/");

        let cart = resolve_endpoint(&base(), "cart").unwrap();
        assert_eq!(cart.url.path(), "/cart/");
    }

    #[test]
    fn test_custom_path() {
        let ep = resolve_endpoint(&base(), "custom:/wp-json/wc/v3/products").unwrap();
        assert_eq!(ep.url.path(), "/wp-json/wc/v3/products");
        assert_eq!(ep.slug, "custom:/wp-json/wc/v3/products");
    }

    #[test]
    fn test_unknown_slug_is_error() {
        assert!(matches!(
            resolve_endpoint(&base(), "blog"),
            Err(ConfigError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_rotation_mode_parse() {
        assert_eq!("serial".parse::<RotationMode>().unwrap(), RotationMode::Serial);
        assert_eq!("RANDOM".parse::<RotationMode>().unwrap(), RotationMode::Random);
        assert!("shuffled".parse::<RotationMode>().is_err());
    }
}
