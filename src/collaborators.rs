//! External collaborators (§6). These are the seams between this module and
//! the surrounding agent: Steam web session management, inventory retrieval,
//! trade-offer dispatch, and mobile-authenticator confirmations. The core
//! lifecycle/matching logic depends only on these traits, never on a
//! concrete HTTP client, so it can be driven by fakes in tests.

use async_trait::async_trait;
use std::fmt;

use crate::model::{Asset, AssetType, SetKey};

/// Fetches a steam account's inventory, optionally restricted to tradable
/// items, specific matchable types, and/or specific set keys (and excluding
/// a set of already-exhausted set keys mid-round).
///
/// `Ok(None)` means the fetch is *absent* (the account's inventory could not
/// be retrieved at all) as distinct from `Ok(Some(vec![]))`, a successful
/// fetch that simply found nothing matching the filters. `Err` is reserved
/// for errors the caller should log and treat identically to "absent" but
/// that carry diagnostic context.
#[async_trait]
pub trait InventoryCollaborator: Send + Sync {
    async fn fetch_inventory(
        &self,
        steam_id: u64,
        tradable_only: bool,
        wanted_types: Option<&[AssetType]>,
        wanted_sets: Option<&[SetKey]>,
        skipped_sets: &[SetKey],
    ) -> anyhow::Result<Option<Vec<Asset>>>;
}

/// Outcome of submitting a trade offer: whether the offer was accepted by
/// Steam for delivery, and any mobile-confirmation IDs it now requires.
#[derive(Clone, Default)]
pub struct TradeSubmission {
    pub accepted: bool,
    pub confirmation_ids: Vec<u64>,
}

#[async_trait]
pub trait TradeOfferCollaborator: Send + Sync {
    /// `give`/`take` are concrete asset lists already resolved from the
    /// matching engine's `class_id → count` proposal.
    async fn submit_trade_offer(
        &self,
        recipient_steam_id: u64,
        recipient_trade_token: &str,
        give: Vec<Asset>,
        take: Vec<Asset>,
        bypass_escrow_checks: bool,
    ) -> anyhow::Result<TradeSubmission>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationKind {
    Trade,
}

#[async_trait]
pub trait ConfirmationCollaborator: Send + Sync {
    /// Accepts (or rejects, if `accept = false`) the given mobile-confirmation
    /// IDs. `wait_if_needed` allows the implementation to poll until the
    /// confirmation appears rather than failing immediately.
    async fn accept_confirmations(
        &self,
        accept: bool,
        kind: ConfirmationKind,
        actor_steam_id: u64,
        ids: &[u64],
        wait_if_needed: bool,
    ) -> anyhow::Result<bool>;
}

/// Account-level remote checks and profile actions (§4.2 steps 4-5, §4.3
/// step 2, and the persona-state/group-join surface from §6).
#[async_trait]
pub trait AccountCollaborator: Send + Sync {
    /// §4.5 guard 1. Transient failures are reported as `false`, never `Err`.
    async fn is_connected(&self, steam_id: u64) -> bool;

    /// §4.2 step 5. Transient failures are reported as `false`, never `Err`.
    async fn has_valid_api_key(&self, steam_id: u64) -> bool;

    /// §4.2 step 4. Transient failures are reported as `false`, never `Err`.
    async fn is_inventory_public(&self, steam_id: u64) -> bool;

    /// §4.3 step 2. An empty string is treated the same as no token.
    async fn own_trade_token(&self, steam_id: u64) -> anyhow::Result<String>;

    /// Requests an eventual persona-state callback from the platform; the
    /// result arrives later as an `on_persona_state` invocation on the
    /// lifecycle controller, not as this call's return value.
    async fn request_persona_state(&self, steam_id: u64) -> anyhow::Result<()>;

    /// Exposed for the surrounding agent's onboarding flow; the lifecycle and
    /// matching components in this module never call it themselves.
    async fn join_group(&self, steam_id: u64, group_id: u64) -> anyhow::Result<()>;
}

/// RAII guard for the agent-wide trading lock (§5): held for the duration of
/// one matching round, shared with manual trade handling.
pub trait TradingLockGuard: Send {}

#[async_trait]
pub trait TradingLockCollaborator: Send + Sync {
    async fn acquire_trading_lock(&self) -> Box<dyn TradingLockGuard>;
}

/// Fields posted to `/Api/Announce` (§6). `matchable_types` is serialized as
/// a JSON array of the category enumeration's numeric codes by the concrete
/// HTTP client, not by this struct itself.
#[derive(Debug, Clone)]
pub struct AnnouncementPayload {
    pub steam_id: u64,
    pub guid: String,
    pub nickname: String,
    pub avatar_hash: String,
    pub games_count: u32,
    pub items_count: u32,
    pub matchable_types: Vec<AssetType>,
    pub match_everything: bool,
    pub trade_token: String,
}

/// The matching directory's own HTTP API (§6): heartbeat, announce, and the
/// public bot listing. Distinct from `AccountCollaborator`, which concerns
/// the Steam platform itself rather than this module's directory server.
#[async_trait]
pub trait DirectoryCollaborator: Send + Sync {
    /// `true` iff the server returned a non-null (successful) response.
    async fn post_heartbeat(&self, steam_id: u64, guid: &str) -> bool;

    /// `true` iff the server returned a non-null (successful) response.
    /// Attempted at most once by the caller; this method itself never retries.
    async fn post_announcement(&self, payload: &AnnouncementPayload) -> bool;

    /// Raw directory entries, each decoded independently by `ListedUser::decode`.
    /// `None` means the fetch failed outright; `Some(vec![])` is a successful
    /// but empty directory.
    async fn fetch_bots(&self) -> Option<Vec<serde_json::Value>>;
}

impl fmt::Debug for TradeSubmission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TradeSubmission")
            .field("accepted", &self.accepted)
            .field("confirmation_ids", &self.confirmation_ids.len())
            .finish()
    }
}
