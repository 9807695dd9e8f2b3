//! Runtime configuration loaded from the environment
//!
//! `main` calls `dotenvy::dotenv()` first, so a local `.env` file works too.
//!
//! | Variable           | Default                 |
//! |--------------------|-------------------------|
//! | `DATABASE_URL`     | required                |
//! | `BIND_ADDRESS`     | `0.0.0.0:3000`          |
//! | `MAIL_WEBHOOK_URL` | unset (log-only mailer) |
//! | `MAIL_FROM`        | `deals@dealflow.local`  |
//! | `RUN_MIGRATIONS`   | `true`                  |

use std::net::SocketAddr;

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";
const DEFAULT_MAIL_FROM: &str = "deals@dealflow.local";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_address: SocketAddr,
    /// Mail gateway endpoint; notifications are only logged when unset
    pub mail_webhook_url: Option<String>,
    pub mail_from: String,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { var: &'static str, value: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(var) => write!(f, "{} must be set", var),
            ConfigError::Invalid { var, value } => write!(f, "{} has invalid value '{}'", var, value),
        }
    }
}

impl std::error::Error for ConfigError {}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup (tests pass a map)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let bind_raw = lookup("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
        let bind_address = bind_raw.parse().map_err(|_| ConfigError::Invalid {
            var: "BIND_ADDRESS",
            value: bind_raw.clone(),
        })?;

        let mail_webhook_url = lookup("MAIL_WEBHOOK_URL").filter(|v| !v.trim().is_empty());
        if let Some(ref url) = mail_webhook_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::Invalid {
                    var: "MAIL_WEBHOOK_URL",
                    value: url.clone(),
                });
            }
        }

        let mail_from = lookup("MAIL_FROM").unwrap_or_else(|| DEFAULT_MAIL_FROM.to_string());

        let run_migrations = match lookup("RUN_MIGRATIONS") {
            None => true,
            Some(v) => match v.to_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "RUN_MIGRATIONS",
                        value: v,
                    })
                }
            },
        };

        Ok(Self {
            database_url,
            bind_address,
            mail_webhook_url,
            mail_from,
            run_migrations,
        })
    }
}
