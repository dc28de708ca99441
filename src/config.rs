use serde::Deserialize;
use std::env;

use crate::constants::{DEFAULT_RPC_URL, ZERO_ADDRESS};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,
    pub environment: String,

    // Blockchain
    pub rpc_url: String,
    pub chain_id: u64,
    pub contract_address: String,

    // Oracle signer
    pub oracle_private_key: Option<String>,
    pub oracle_autostart: bool,

    // External result feed
    pub result_feed_url: String,
    pub result_feed_api_key: Option<String>,

    // CORS
    pub cors_allowed_origins: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),

            rpc_url: env::var("RPC_URL").unwrap_or_else(|_| DEFAULT_RPC_URL.to_string()),
            chain_id: env::var("CHAIN_ID")
                .unwrap_or_else(|_| "420420421".to_string())
                .parse()?,
            contract_address: env::var("CONTRACT_ADDRESS").unwrap_or_default(),

            oracle_private_key: env::var("ORACLE_PRIVATE_KEY").ok(),
            oracle_autostart: env_flag("ORACLE_AUTOSTART", false),

            result_feed_url: env::var("RESULT_FEED_URL")
                .unwrap_or_else(|_| "https://api.mydupr.com".to_string()),
            result_feed_api_key: env::var("RESULT_FEED_API_KEY").ok(),

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:5173,http://localhost:5174".to_string()),
        })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if url::Url::parse(&self.rpc_url).is_err() {
            anyhow::bail!("RPC_URL is not a valid URL: {}", self.rpc_url);
        }
        if url::Url::parse(&self.result_feed_url).is_err() {
            anyhow::bail!("RESULT_FEED_URL is not a valid URL: {}", self.result_feed_url);
        }
        if self.contract_address.trim().is_empty() || self.contract_address == ZERO_ADDRESS {
            anyhow::bail!("CONTRACT_ADDRESS is not configured. Set it in the environment");
        }
        if !self.contract_address.starts_with("0x") {
            anyhow::bail!("CONTRACT_ADDRESS must be a 0x-prefixed hex address");
        }

        if self.oracle_private_key.is_none() {
            tracing::warn!("Oracle private key not configured; using an ephemeral dev wallet");
        }
        if self.result_feed_api_key.is_none() {
            tracing::warn!("Result feed API key not configured; feed requests are unauthenticated");
        }
        if self.cors_allowed_origins.trim().is_empty() {
            tracing::warn!("CORS_ALLOWED_ORIGINS is empty; requests may be blocked");
        }

        Ok(())
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .map(|value| {
            matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
        .unwrap_or(default)
}
