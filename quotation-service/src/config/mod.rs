//! Configuration for quotation-service, loaded from the environment.

use serde::Deserialize;
use service_core::config::Config as CoreConfig;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct QuotationConfig {
    pub common: CoreConfig,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

impl QuotationConfig {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let port = env::var("QUOTATION_SERVICE_PORT")
            .unwrap_or_else(|_| "3006".to_string())
            .parse()
            .map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("Invalid QUOTATION_SERVICE_PORT: {}", e))
            })?;

        let url = env::var("QUOTATION_DATABASE_URL").map_err(|_| {
            AppError::ConfigError(anyhow::anyhow!("QUOTATION_DATABASE_URL must be set"))
        })?;

        let max_connections = env::var("QUOTATION_DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);
        let min_connections = env::var("QUOTATION_DB_MIN_CONNECTIONS")
            .unwrap_or_else(|_| "1".to_string())
            .parse()
            .unwrap_or(1);

        Ok(Self {
            common: CoreConfig { port },
            service_name: "quotation-service".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok(),
            database: DatabaseConfig {
                url,
                max_connections,
                min_connections,
            },
        })
    }
}
