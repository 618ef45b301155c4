//! HTTP implementation of `DirectoryCollaborator` against the matching
//! directory's `/Api/HeartBeat`, `/Api/Announce`, and `/Api/Bots` endpoints
//! (§6). Client construction, retry, and logging follow the same pattern as
//! the host agent's other market-data scrapers.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::collaborators::{AnnouncementPayload, DirectoryCollaborator};

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 200;

pub struct DirectoryClient {
    client: Client,
    base_url: String,
}

impl DirectoryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent("steam-match-bot/0.1")
            .build()
            .expect("failed to build directory HTTP client");

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// GET/POST with up to `MAX_RETRIES` attempts and exponential backoff,
    /// treating any non-success status or transport error as retryable.
    async fn execute_with_retry(
        &self,
        build: impl Fn() -> reqwest::RequestBuilder,
    ) -> Option<reqwest::Response> {
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        for attempt in 1..=MAX_RETRIES {
            match build().send().await {
                Ok(resp) if resp.status().is_success() => return Some(resp),
                Ok(resp) => {
                    debug!(status = %resp.status(), attempt, "directory request returned non-success status");
                }
                Err(err) => {
                    debug!(error = %err, attempt, "directory request failed");
                }
            }

            if attempt < MAX_RETRIES {
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms *= 2;
            }
        }

        None
    }
}

#[async_trait]
impl DirectoryCollaborator for DirectoryClient {
    async fn post_heartbeat(&self, steam_id: u64, guid: &str) -> bool {
        let url = format!("{}/Api/HeartBeat", self.base_url);
        let form = [
            ("SteamID", steam_id.to_string()),
            ("Guid", guid.to_string()),
        ];

        let response = self
            .execute_with_retry(|| self.client.post(&url).form(&form))
            .await;

        if response.is_none() {
            warn!(steam_id, "heartbeat POST failed after retries");
        }
        response.is_some()
    }

    async fn post_announcement(&self, payload: &AnnouncementPayload) -> bool {
        let url = format!("{}/Api/Announce", self.base_url);
        let matchable_codes: Vec<u8> = payload
            .matchable_types
            .iter()
            .map(|t| t.wire_code())
            .collect();
        let matchable_json = serde_json::to_string(&matchable_codes).unwrap_or_else(|_| "[]".into());

        let form = [
            ("SteamID", payload.steam_id.to_string()),
            ("Guid", payload.guid.clone()),
            ("Nickname", payload.nickname.clone()),
            ("AvatarHash", payload.avatar_hash.clone()),
            ("GamesCount", payload.games_count.to_string()),
            ("ItemsCount", payload.items_count.to_string()),
            ("MatchableTypes", matchable_json),
            (
                "MatchEverything",
                if payload.match_everything { "1" } else { "0" }.to_string(),
            ),
            ("TradeToken", payload.trade_token.clone()),
        ];

        // Announcement is attempted at most once; no retry loop here.
        let response = self.client.post(&url).form(&form).send().await;
        match response {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                warn!(status = %resp.status(), steam_id = payload.steam_id, "announcement rejected");
                false
            }
            Err(err) => {
                warn!(error = %err, steam_id = payload.steam_id, "announcement request failed");
                false
            }
        }
    }

    async fn fetch_bots(&self) -> Option<Vec<serde_json::Value>> {
        let url = format!("{}/Api/Bots", self.base_url);
        let response = self.execute_with_retry(|| self.client.get(&url)).await?;

        match response.json::<Vec<serde_json::Value>>().await {
            Ok(entries) => Some(entries),
            Err(err) => {
                warn!(error = %err, "failed to parse /Api/Bots response body");
                None
            }
        }
    }
}
