//! Environment configuration

use std::{env, time::Duration};
use thiserror::Error;

use crate::auth::DEFAULT_TOKEN_TTL;
use crate::server::ServerConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[derive(Clone, Debug)]
pub struct Config {
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub server: ServerConfig,
}

impl Config {
    /// Build configuration from the process environment, loading `.env` first
    /// when one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// `JWT_SECRET` is required; everything else has a default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let token_ttl = match lookup("TOKEN_TTL_SECONDS") {
            Some(v) => Duration::from_secs(parse("TOKEN_TTL_SECONDS", &v)?),
            None => DEFAULT_TOKEN_TTL,
        };

        let defaults = ServerConfig::default();
        let server = ServerConfig {
            host: lookup("GRAPHQL_HOST").unwrap_or(defaults.host),
            port: match lookup("GRAPHQL_PORT") {
                Some(v) => parse("GRAPHQL_PORT", &v)?,
                None => defaults.port,
            },
            enable_playground: lookup("GRAPHQL_PLAYGROUND")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.enable_playground),
        };

        Ok(Self {
            jwt_secret,
            token_ttl,
            server,
        })
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(key, value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[("JWT_SECRET", "s3cret")])).unwrap();
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.token_ttl, Duration::from_secs(7200));
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 4000);
        assert!(config.server.enable_playground);
    }

    #[test]
    fn test_missing_secret() {
        assert_eq!(
            Config::from_lookup(lookup(&[])).unwrap_err(),
            ConfigError::Missing("JWT_SECRET")
        );
        assert_eq!(
            Config::from_lookup(lookup(&[("JWT_SECRET", "")])).unwrap_err(),
            ConfigError::Missing("JWT_SECRET")
        );
    }

    #[test]
    fn test_overrides_and_invalid_values() {
        let config = Config::from_lookup(lookup(&[
            ("JWT_SECRET", "s3cret"),
            ("TOKEN_TTL_SECONDS", "60"),
            ("GRAPHQL_PORT", "8080"),
            ("GRAPHQL_PLAYGROUND", "false"),
        ]))
        .unwrap();
        assert_eq!(config.token_ttl, Duration::from_secs(60));
        assert_eq!(config.server.port, 8080);
        assert!(!config.server.enable_playground);

        assert_eq!(
            Config::from_lookup(lookup(&[("JWT_SECRET", "s"), ("GRAPHQL_PORT", "http")]))
                .unwrap_err(),
            ConfigError::Invalid("GRAPHQL_PORT", "http".to_string())
        );
    }
}
