use async_trait::async_trait;
use ethers::types::Address;
use serde::Deserialize;

use crate::{
    chain::parse_address,
    config::Config,
    error::{AppError, Result},
};

/// Source of off-chain match results. Behind a trait so the settlement loop
/// can be exercised against a fake feed in tests.
#[async_trait]
pub trait ResultSource: Send + Sync {
    /// Returns the winner's address once the external feed reports the match
    /// as finished, or None while it is still pending.
    async fn winner_of(&self, external_match_id: &str) -> Result<Option<Address>>;
}

#[derive(Debug, Deserialize)]
struct FeedMatch {
    status: String,
    winner: Option<String>,
}

/// HTTP client for the external sports-result API (DUPR-style).
pub struct ResultFeedClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl ResultFeedClient {
    pub fn from_config(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.result_feed_url.trim_end_matches('/').to_string(),
            api_key: config.result_feed_api_key.clone(),
        }
    }
}

#[async_trait]
impl ResultSource for ResultFeedClient {
    async fn winner_of(&self, external_match_id: &str) -> Result<Option<Address>> {
        let url = format!("{}/matches/{}", self.base_url, external_match_id);
        tracing::debug!(external_match_id, "Querying result feed");

        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::ResultFeed(format!("request to {url} failed: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(AppError::ResultFeed(format!(
                "feed returned {} for {external_match_id}",
                response.status()
            )));
        }

        let payload: FeedMatch = response
            .json()
            .await
            .map_err(|e| AppError::ResultFeed(format!("malformed feed payload: {e}")))?;

        winner_from_payload(&payload)
    }
}

fn winner_from_payload(payload: &FeedMatch) -> Result<Option<Address>> {
    if !payload.status.eq_ignore_ascii_case("completed") {
        return Ok(None);
    }

    match payload.winner.as_deref() {
        Some(raw) if !raw.trim().is_empty() => parse_address(raw)
            .map(Some)
            .map_err(|_| AppError::ResultFeed(format!("feed reported invalid winner: {raw}"))),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_match_has_no_winner() {
        let payload = FeedMatch {
            status: "in_progress".to_string(),
            winner: None,
        };
        assert!(winner_from_payload(&payload).unwrap().is_none());
    }

    #[test]
    fn completed_match_yields_winner_address() {
        let payload = FeedMatch {
            status: "COMPLETED".to_string(),
            winner: Some("0x1111111111111111111111111111111111111111".to_string()),
        };
        let winner = winner_from_payload(&payload).unwrap().unwrap();
        assert_eq!(winner, Address::repeat_byte(0x11));
    }

    #[test]
    fn completed_match_with_bad_winner_is_an_error() {
        let payload = FeedMatch {
            status: "completed".to_string(),
            winner: Some("definitely-not-an-address".to_string()),
        };
        assert!(winner_from_payload(&payload).is_err());
    }

    #[test]
    fn completed_match_without_winner_is_pending() {
        let payload = FeedMatch {
            status: "completed".to_string(),
            winner: None,
        };
        assert!(winner_from_payload(&payload).unwrap().is_none());
    }
}
