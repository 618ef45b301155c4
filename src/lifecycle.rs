//! C3: the announcement/heartbeat controller (§4.3).
//!
//! Modeled explicitly as the three-state machine sketched in SPEC_FULL.md
//! §9: `Unannounced -> Announced -> HeartbeatPaused -> Announced -> ...`.
//! The underlying storage is still the source's boolean-plus-timestamps
//! representation (§3's lifecycle clocks) because that is what needs to be
//! mutated atomically under `requests_lock`; `state()` derives the explicit
//! enum from it for observability (the `/status` endpoint, §10.5).

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::collaborators::{AccountCollaborator, AnnouncementPayload, DirectoryCollaborator, InventoryCollaborator};
use crate::eligibility;
use crate::model::BotConfig;

pub const MIN_ANNOUNCEMENT_CHECK_TTL: Duration = Duration::hours(6);
pub const MIN_HEARTBEAT_TTL: Duration = Duration::minutes(10);
pub const MIN_PERSONA_STATE_TTL: Duration = Duration::hours(8);
pub const DEFAULT_MIN_ITEMS_COUNT: usize = 100;

/// Observable lifecycle state, derived from `LifecycleClocks` (§9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unannounced,
    Announced,
    HeartbeatPaused,
}

struct LifecycleClocks {
    last_announcement_check: DateTime<Utc>,
    last_heartbeat: DateTime<Utc>,
    last_persona_state_request: DateTime<Utc>,
    should_send_heartbeats: bool,
    /// Whether an announcement has ever succeeded; distinguishes
    /// `Unannounced` from `HeartbeatPaused` (both have
    /// `should_send_heartbeats = false`).
    ever_announced: bool,
}

impl LifecycleClocks {
    fn zero_epoch() -> Self {
        Self {
            last_announcement_check: DateTime::<Utc>::from_timestamp(0, 0).unwrap(),
            last_heartbeat: DateTime::<Utc>::from_timestamp(0, 0).unwrap(),
            last_persona_state_request: DateTime::<Utc>::from_timestamp(0, 0).unwrap(),
            should_send_heartbeats: false,
            ever_announced: false,
        }
    }

    fn state(&self) -> LifecycleState {
        if self.should_send_heartbeats {
            LifecycleState::Announced
        } else if self.ever_announced {
            LifecycleState::HeartbeatPaused
        } else {
            LifecycleState::Unannounced
        }
    }
}

/// A point-in-time snapshot for the `/status` operability endpoint.
#[derive(Debug, Clone, serde::Serialize)]
pub struct LifecycleSnapshot {
    pub state: String,
    pub last_announcement_check: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
    pub last_persona_state_request: DateTime<Utc>,
    pub should_send_heartbeats: bool,
}

pub struct LifecycleController {
    clocks: Mutex<LifecycleClocks>,
    clock: Arc<dyn Clock>,
    directory: Arc<dyn DirectoryCollaborator>,
    account: Arc<dyn AccountCollaborator>,
    inventory: Arc<dyn InventoryCollaborator>,
    guid: String,
    min_items_count: usize,
}

impl LifecycleController {
    pub fn new(
        clock: Arc<dyn Clock>,
        directory: Arc<dyn DirectoryCollaborator>,
        account: Arc<dyn AccountCollaborator>,
        inventory: Arc<dyn InventoryCollaborator>,
        guid: String,
    ) -> Self {
        Self {
            clocks: Mutex::new(LifecycleClocks::zero_epoch()),
            clock,
            directory,
            account,
            inventory,
            guid,
            min_items_count: DEFAULT_MIN_ITEMS_COUNT,
        }
    }

    pub async fn snapshot(&self) -> LifecycleSnapshot {
        let clocks = self.clocks.lock().await;
        LifecycleSnapshot {
            state: format!("{:?}", clocks.state()),
            last_announcement_check: clocks.last_announcement_check,
            last_heartbeat: clocks.last_heartbeat,
            last_persona_state_request: clocks.last_persona_state_request,
            should_send_heartbeats: clocks.should_send_heartbeats,
        }
    }

    /// Invoked on the agent's periodic heartbeat cadence. Fires both the
    /// persona-refresh race and the heartbeat POST, each re-validating its
    /// own TTL gate once `requests_lock` (here, `self.clocks`) is held.
    pub async fn on_heartbeat_tick(&self, bot: &BotConfig) {
        let now = self.clock.now();

        self.maybe_request_persona_refresh(bot, now).await;
        self.maybe_send_heartbeat(bot, now).await;
    }

    async fn maybe_request_persona_refresh(&self, bot: &BotConfig, now: DateTime<Utc>) {
        // Cheap pre-check avoids acquiring the lock on every tick once both
        // TTLs are far from expiry; the authoritative check happens below.
        {
            let clocks = self.clocks.lock().await;
            if !(now > clocks.last_persona_state_request + MIN_PERSONA_STATE_TTL
                && now > clocks.last_announcement_check + MIN_ANNOUNCEMENT_CHECK_TTL)
            {
                return;
            }
        }

        let mut clocks = self.clocks.lock().await;
        if !(now > clocks.last_persona_state_request + MIN_PERSONA_STATE_TTL
            && now > clocks.last_announcement_check + MIN_ANNOUNCEMENT_CHECK_TTL)
        {
            return;
        }
        clocks.last_persona_state_request = now;
        drop(clocks);

        if let Err(err) = self.account.request_persona_state(bot.steam_id).await {
            debug!(steam_id = bot.steam_id, error = %err, "persona state request failed");
        }
    }

    async fn maybe_send_heartbeat(&self, bot: &BotConfig, now: DateTime<Utc>) {
        let mut clocks = self.clocks.lock().await;
        if !(clocks.should_send_heartbeats && now >= clocks.last_heartbeat + MIN_HEARTBEAT_TTL) {
            return;
        }

        // Hold the lock across the request: heartbeats and announcements
        // must never overlap for the same bot (§5 single-flight).
        let ok = self.directory.post_heartbeat(bot.steam_id, &self.guid).await;
        if ok {
            clocks.last_heartbeat = now;
            debug!(steam_id = bot.steam_id, "heartbeat sent");
        } else {
            debug!(steam_id = bot.steam_id, "heartbeat POST failed, will retry next tick");
        }
    }

    /// Invoked when the platform reports a profile change for this bot.
    /// Drives the announcement path (§4.3).
    pub async fn on_persona_state(
        &self,
        bot: &BotConfig,
        nickname: Option<String>,
        avatar_hash: Option<String>,
    ) {
        let now = self.clock.now();

        // Held for the entire announcement path, matching `maybe_send_heartbeat`:
        // `requests_lock` must serialize the whole request path, not just the
        // clock mutations either side of it (§4.3/§5), so no other await point
        // in this method may drop `clocks` before the function returns.
        let mut clocks = self.clocks.lock().await;
        if now < clocks.last_announcement_check + MIN_ANNOUNCEMENT_CHECK_TTL {
            return;
        }

        // Step 1: eligibility.
        if !eligibility::eligible(bot, self.account.as_ref()).await {
            clocks.last_announcement_check = now;
            clocks.should_send_heartbeats = false;
            debug!(steam_id = bot.steam_id, "ineligible, skipping announcement");
            return;
        }

        // Step 2: trade token.
        let trade_token = match self.account.own_trade_token(bot.steam_id).await {
            Ok(token) if !token.is_empty() => token,
            Ok(_) => {
                clocks.last_announcement_check = now;
                clocks.should_send_heartbeats = false;
                debug!(steam_id = bot.steam_id, "empty trade token, skipping announcement");
                return;
            }
            Err(err) => {
                clocks.last_announcement_check = now;
                clocks.should_send_heartbeats = false;
                warn!(steam_id = bot.steam_id, error = %err, "failed to obtain trade token");
                return;
            }
        };

        // Step 3: matchable-type intersection.
        let accepted_types = bot.accepted_matchable_types();
        if accepted_types.is_empty() {
            clocks.last_announcement_check = now;
            clocks.should_send_heartbeats = false;
            warn!(
                steam_id = bot.steam_id,
                "configured matchable types do not intersect the accepted set"
            );
            return;
        }

        // Step 4: own inventory fetch.
        let fetched = self
            .inventory
            .fetch_inventory(bot.steam_id, true, Some(&accepted_types), None, &[])
            .await;

        let items = match fetched {
            Ok(Some(items)) => items,
            Ok(None) | Err(_) => {
                clocks.should_send_heartbeats = false;
                debug!(
                    steam_id = bot.steam_id,
                    "own inventory fetch failed, will retry on next eligible tick"
                );
                return;
            }
        };

        // Step 5: minimum item count.
        if items.len() < self.min_items_count {
            clocks.last_announcement_check = now;
            clocks.should_send_heartbeats = false;
            debug!(
                steam_id = bot.steam_id,
                item_count = items.len(),
                "inventory below minimum item count, skipping announcement"
            );
            return;
        }

        // Step 6: build and POST the announcement payload.
        let games_count = {
            let mut apps: Vec<u32> = items.iter().map(|a| a.real_app_id).collect();
            apps.sort_unstable();
            apps.dedup();
            apps.len() as u32
        };

        let payload = AnnouncementPayload {
            steam_id: bot.steam_id,
            guid: self.guid.clone(),
            nickname: nickname.unwrap_or_default(),
            avatar_hash: avatar_hash.unwrap_or_default(),
            games_count,
            items_count: items.len() as u32,
            matchable_types: accepted_types,
            match_everything: bot.preferences.match_everything,
            trade_token,
        };

        let ok = self.directory.post_announcement(&payload).await;

        // Step 7.
        if ok {
            clocks.last_announcement_check = now;
            clocks.should_send_heartbeats = true;
            clocks.ever_announced = true;
            info!(steam_id = bot.steam_id, items_count = payload.items_count, "announced");
        } else {
            // Preserves the §3 invariant that `should_send_heartbeats` implies
            // the most recent announcement succeeded; the TTL is deliberately
            // left unadvanced so the next eligible tick retries.
            clocks.should_send_heartbeats = false;
            warn!(steam_id = bot.steam_id, "announcement POST failed");
        }
    }
}
