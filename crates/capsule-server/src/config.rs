use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[derive(Debug)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = var("CAPSULE_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("CAPSULE_JWT_SECRET is unset or still a placeholder; set it in .env and restart");
        }

        let port = var("CAPSULE_PORT").unwrap_or_else(|| "3000".into());
        let port: u16 = port
            .parse()
            .with_context(|| format!("CAPSULE_PORT is not a port number: {}", port))?;

        Ok(Self {
            jwt_secret,
            db_path: var("CAPSULE_DB_PATH").unwrap_or_else(|| "capsule.db".into()).into(),
            host: var("CAPSULE_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
        })
    }
}
