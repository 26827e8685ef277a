use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use axum::http::HeaderValue;
use thiserror::Error;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_TOKEN_TTL_DAYS: i64 = 7;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub bcrypt_cost: u32,
    pub cors_allowed_origins: Vec<String>,
    pub production: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        // Required; there is no default secret.
        let jwt_secret = value("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let token_ttl_days = parse_or(&lookup, "TOKEN_TTL_DAYS", DEFAULT_TOKEN_TTL_DAYS)?;
        if token_ttl_days <= 0 {
            return Err(ConfigError::Invalid {
                name: "TOKEN_TTL_DAYS",
                value: token_ttl_days.to_string(),
            });
        }

        let cors_allowed_origins = parse_origins(
            &value("CORS_ALLOWED_ORIGINS").unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_string()),
        )?;

        Ok(Self {
            jwt_secret,
            token_ttl_days,
            database_url: value("DATABASE_URL"),
            database_max_connections: parse_or(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                DEFAULT_MAX_CONNECTIONS,
            )?,
            port: parse_or(&lookup, "PORT", DEFAULT_PORT)?,
            upload_dir: value("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR)),
            bcrypt_cost: parse_or(&lookup, "BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            cors_allowed_origins,
            production: value("RUST_ENV")
                .map(|v| v.to_lowercase() == "production")
                .unwrap_or(false),
        })
    }
}

/// Comma-separated origins. Credentialed CORS needs explicit origins, so an
/// empty list, a wildcard or an unparsable entry is rejected.
fn parse_origins(raw: &str) -> Result<Vec<String>, ConfigError> {
    let invalid = || ConfigError::Invalid {
        name: "CORS_ALLOWED_ORIGINS",
        value: raw.to_string(),
    };

    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect();
    if origins.is_empty() {
        return Err(invalid());
    }
    for origin in &origins {
        if origin == "*" || HeaderValue::from_str(origin).is_err() {
            return Err(invalid());
        }
    }
    Ok(origins)
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name).filter(|v| !v.trim().is_empty()) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn missing_secret_fails_closed() {
        assert_eq!(
            config(&[]).unwrap_err(),
            ConfigError::Missing("JWT_SECRET")
        );
        assert_eq!(
            config(&[("JWT_SECRET", "   ")]).unwrap_err(),
            ConfigError::Missing("JWT_SECRET")
        );
    }

    #[test]
    fn defaults_apply() {
        let config = config(&[("JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(config.token_ttl_days, 7);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.database_url, None);
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert_eq!(config.bcrypt_cost, bcrypt::DEFAULT_COST);
        assert_eq!(
            config.cors_allowed_origins,
            vec!["http://localhost:3000", "http://localhost:5173"]
        );
        assert!(!config.production);
    }

    #[test]
    fn invalid_numbers_are_errors() {
        assert!(matches!(
            config(&[("JWT_SECRET", "s"), ("PORT", "eighty")]),
            Err(ConfigError::Invalid { name: "PORT", .. })
        ));
        assert!(matches!(
            config(&[("JWT_SECRET", "s"), ("TOKEN_TTL_DAYS", "0")]),
            Err(ConfigError::Invalid {
                name: "TOKEN_TTL_DAYS",
                ..
            })
        ));
    }

    #[test]
    fn origins_must_be_explicit_and_valid() {
        let cfg = config(&[
            ("JWT_SECRET", "s"),
            ("CORS_ALLOWED_ORIGINS", " https://app.example.com , ,https://admin.example.com"),
        ])
        .unwrap();
        assert_eq!(
            cfg.cors_allowed_origins,
            vec!["https://app.example.com", "https://admin.example.com"]
        );

        for bad in [" , ", "*", "https://ok.example.com,bad\u{7f}origin"] {
            assert_eq!(
                config(&[("JWT_SECRET", "s"), ("CORS_ALLOWED_ORIGINS", bad)]).unwrap_err(),
                ConfigError::Invalid {
                    name: "CORS_ALLOWED_ORIGINS",
                    value: bad.to_string(),
                },
                "{bad:?} should be refused"
            );
        }
    }

    #[test]
    fn production_flag_is_case_insensitive() {
        let config = config(&[("JWT_SECRET", "s"), ("RUST_ENV", "Production")]).unwrap();
        assert!(config.production);
    }
}
