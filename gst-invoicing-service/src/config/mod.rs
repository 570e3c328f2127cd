use crate::services::SweepConfig;
use secrecy::Secret;
use serde::Deserialize;
use service_core::config::{self as core_config, get_env};
use service_core::error::AppError;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct InvoicingConfig {
    pub common: core_config::Config,
    pub mongodb: MongoConfig,
    pub jwt_secret: Secret<String>,
    pub sweep: SweepConfig,
    pub is_production: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

impl InvoicingConfig {
    pub fn load() -> Result<Self, AppError> {
        // Handles .env, the optional configuration file and APP__ variables
        let common = core_config::Config::load()?;
        let is_prod = core_config::is_production();

        let sweep_enabled = parse_flag(
            "OVERDUE_SWEEP_ENABLED",
            &get_env("OVERDUE_SWEEP_ENABLED", Some("true"), is_prod)?,
        )?;
        let sweep_interval_secs: u64 = get_env("OVERDUE_SWEEP_INTERVAL_SECS", Some("3600"), is_prod)?
            .parse()
            .map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!(
                    "OVERDUE_SWEEP_INTERVAL_SECS must be a number of seconds: {}",
                    e
                ))
            })?;

        Ok(InvoicingConfig {
            common,
            mongodb: MongoConfig {
                uri: get_env("MONGODB_URI", None, is_prod)?,
                database: get_env("MONGODB_DATABASE", Some("gst_invoicing"), is_prod)?,
            },
            jwt_secret: Secret::new(get_env("JWT_SECRET", Some("dev-secret"), is_prod)?),
            sweep: SweepConfig {
                enabled: sweep_enabled,
                interval: Duration::from_secs(sweep_interval_secs.max(1)),
            },
            is_production: is_prod,
        })
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, AppError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(AppError::ConfigError(anyhow::anyhow!(
            "{} must be true or false, got {}",
            key,
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_accept_common_spellings() {
        assert!(parse_flag("X", "TRUE").unwrap());
        assert!(!parse_flag("X", "0").unwrap());
        assert!(parse_flag("X", "maybe").is_err());
    }
}
