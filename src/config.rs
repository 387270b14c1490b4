//! Application configuration loaded from environment variables.
//!
//! Program economics (earn rate, retention window, spin outcome table,
//! payout ceiling) are configuration rather than engine logic so they can
//! be tuned without touching the ledger code.

use crate::models::spin::OutcomeTable;
use std::env;

/// Points earned per currency unit of merchandise subtotal.
pub const DEFAULT_EARN_RATE: f64 = 0.10;

/// Days before earned points lapse and become sweepable.
pub const DEFAULT_POINTS_TTL_DAYS: i64 = 30;

/// Program ceiling on the effective giveback rate (5%).
pub const DEFAULT_PAYOUT_CEILING: f64 = 0.05;

/// Bounded internal retries for contended Firestore transactions.
pub const MAX_TXN_RETRIES: u32 = 3;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL for CORS
    pub frontend_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Path to the reward catalog JSON file
    pub catalog_path: String,

    // --- Secrets (injected as env vars by Cloud Run secret bindings) ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Shared token authenticating internal service-to-service calls
    pub service_token: String,

    // --- Program economics ---
    /// Points per currency unit of order subtotal
    pub earn_rate: f64,
    /// Retention window for earned points, in days
    pub points_ttl_days: i64,
    /// Target ceiling for the program's giveback rate
    pub payout_ceiling: f64,
    /// Weighted outcome table for the daily spin
    pub spin_table: OutcomeTable,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// For local development, secrets can be set via environment variables;
    /// in production Cloud Run injects them through secret bindings.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let spin_table = match env::var("SPIN_TABLE_JSON") {
            Ok(raw) => serde_json::from_str::<OutcomeTable>(&raw)
                .map_err(|e| ConfigError::Invalid("SPIN_TABLE_JSON", e.to_string()))?,
            Err(_) => OutcomeTable::default(),
        };
        spin_table
            .validate()
            .map_err(|e| ConfigError::Invalid("SPIN_TABLE_JSON", e.to_string()))?;

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            catalog_path: env::var("REWARD_CATALOG_PATH")
                .unwrap_or_else(|_| "data/rewards.json".to_string()),

            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            service_token: env::var("SERVICE_TOKEN")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("SERVICE_TOKEN"))?,

            earn_rate: parse_env_or("EARN_RATE", DEFAULT_EARN_RATE)?,
            points_ttl_days: parse_env_or("POINTS_TTL_DAYS", DEFAULT_POINTS_TTL_DAYS)?,
            payout_ceiling: parse_env_or("PAYOUT_CEILING", DEFAULT_PAYOUT_CEILING)?,
            spin_table,
        })
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            catalog_path: "data/rewards.json".to_string(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            service_token: "test_service_token".to_string(),
            earn_rate: DEFAULT_EARN_RATE,
            points_ttl_days: DEFAULT_POINTS_TTL_DAYS,
            payout_ceiling: DEFAULT_PAYOUT_CEILING,
            spin_table: OutcomeTable::default(),
        }
    }
}

fn parse_env_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::Invalid(name, e.to_string())),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("JWT_SIGNING_KEY", "test_jwt_key_32_bytes_minimum!!");
        env::set_var("SERVICE_TOKEN", "test_service_token");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.port, 8080);
        assert_eq!(config.earn_rate, DEFAULT_EARN_RATE);
        assert_eq!(config.points_ttl_days, 30);
        config.spin_table.validate().unwrap();
    }

    #[test]
    fn test_default_table_is_valid() {
        Config::test_default().spin_table.validate().unwrap();
    }
}
