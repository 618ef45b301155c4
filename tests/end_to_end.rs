//! Crate-level smoke test (§10.4): announce, then run one active-matching
//! round, against fakes standing in for every external collaborator.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use steam_match_bot::clock::{Clock, SystemClock};
use steam_match_bot::collaborators::{
    AccountCollaborator, AnnouncementPayload, ConfirmationCollaborator, ConfirmationKind,
    DirectoryCollaborator, InventoryCollaborator, TradeOfferCollaborator, TradeSubmission,
    TradingLockCollaborator, TradingLockGuard,
};
use steam_match_bot::model::{Asset, AssetType, BotConfig, SetKey, TradingPreferences};
use steam_match_bot::{LifecycleController, MatchingEngine};

const OUR_STEAM_ID: u64 = 111;
const THEIR_STEAM_ID: u64 = 222;

struct FakeAccount;

#[async_trait]
impl AccountCollaborator for FakeAccount {
    async fn is_connected(&self, _steam_id: u64) -> bool {
        true
    }
    async fn has_valid_api_key(&self, _steam_id: u64) -> bool {
        true
    }
    async fn is_inventory_public(&self, _steam_id: u64) -> bool {
        true
    }
    async fn own_trade_token(&self, _steam_id: u64) -> anyhow::Result<String> {
        Ok("our-token".to_string())
    }
    async fn request_persona_state(&self, _steam_id: u64) -> anyhow::Result<()> {
        Ok(())
    }
    async fn join_group(&self, _steam_id: u64, _group_id: u64) -> anyhow::Result<()> {
        Ok(())
    }
}

fn asset(class_id: u64, amount: u32) -> Asset {
    Asset {
        class_id,
        real_app_id: 730,
        asset_type: AssetType::TradingCard,
        amount,
        asset_id: format!("asset-{class_id}"),
    }
}

struct FakeInventory {
    our_assets: Vec<Asset>,
    their_assets: Vec<Asset>,
}

#[async_trait]
impl InventoryCollaborator for FakeInventory {
    async fn fetch_inventory(
        &self,
        steam_id: u64,
        _tradable_only: bool,
        _wanted_types: Option<&[AssetType]>,
        _wanted_sets: Option<&[SetKey]>,
        _skipped_sets: &[SetKey],
    ) -> anyhow::Result<Option<Vec<Asset>>> {
        if steam_id == OUR_STEAM_ID {
            Ok(Some(self.our_assets.clone()))
        } else {
            Ok(Some(self.their_assets.clone()))
        }
    }
}

struct FakeDirectory {
    announced: std::sync::Mutex<bool>,
    entries: Vec<serde_json::Value>,
}

#[async_trait]
impl DirectoryCollaborator for FakeDirectory {
    async fn post_heartbeat(&self, _steam_id: u64, _guid: &str) -> bool {
        true
    }
    async fn post_announcement(&self, _payload: &AnnouncementPayload) -> bool {
        *self.announced.lock().unwrap() = true;
        true
    }
    async fn fetch_bots(&self) -> Option<Vec<serde_json::Value>> {
        Some(self.entries.clone())
    }
}

struct FakeTradeOffers {
    submitted: AtomicUsize,
}

#[async_trait]
impl TradeOfferCollaborator for FakeTradeOffers {
    async fn submit_trade_offer(
        &self,
        _recipient_steam_id: u64,
        _recipient_trade_token: &str,
        _give: Vec<Asset>,
        _take: Vec<Asset>,
        _bypass_escrow_checks: bool,
    ) -> anyhow::Result<TradeSubmission> {
        self.submitted.fetch_add(1, Ordering::SeqCst);
        Ok(TradeSubmission {
            accepted: true,
            confirmation_ids: vec![],
        })
    }
}

struct FakeConfirmations;

#[async_trait]
impl ConfirmationCollaborator for FakeConfirmations {
    async fn accept_confirmations(
        &self,
        _accept: bool,
        _kind: ConfirmationKind,
        _actor_steam_id: u64,
        _ids: &[u64],
        _wait_if_needed: bool,
    ) -> anyhow::Result<bool> {
        Ok(true)
    }
}

struct FakeGuard;
impl TradingLockGuard for FakeGuard {}

struct FakeTradingLock;

#[async_trait]
impl TradingLockCollaborator for FakeTradingLock {
    async fn acquire_trading_lock(&self) -> Box<dyn TradingLockGuard> {
        Box::new(FakeGuard)
    }
}

fn bot() -> BotConfig {
    BotConfig {
        steam_id: OUR_STEAM_ID,
        nickname: Some("fixture-bot".to_string()),
        preferences: TradingPreferences {
            steam_trade_matcher: true,
            match_actively: true,
            match_everything: false,
        },
        matchable_types: AssetType::MATCHABLE.to_vec(),
        has_mobile_authenticator: true,
        trade_blacklist: HashSet::new(),
    }
}

fn directory_entry() -> serde_json::Value {
    serde_json::json!({
        "steam_id": THEIR_STEAM_ID,
        "trade_token": "their-token",
        "games_count": 10,
        "items_count": 100,
        "match_everything": 1,
        "matchable_backgrounds": 0,
        "matchable_cards": 1,
        "matchable_foil_cards": 0,
        "matchable_emoticons": 0,
    })
}

/// A bot with 100+ items announces successfully, then its active-matching
/// engine finds and submits one duplicate-for-missing trade with a listed
/// candidate bot.
/// Paused so the matching engine's real inter-round `tokio::time::sleep`
/// (five minutes, up to `MAX_MATCHING_ROUNDS - 1` times) fast-forwards
/// instead of costing wall-clock time.
#[tokio::test(start_paused = true)]
async fn announce_then_match_against_a_listed_candidate() {
    let mut our_assets: Vec<Asset> = (0..99).map(|i| asset(1000 + i, 1)).collect();
    our_assets.push(asset(1, 3)); // a duplicate we can give away
    let their_assets = vec![asset(2, 1)]; // the one we're missing

    let directory = Arc::new(FakeDirectory {
        announced: std::sync::Mutex::new(false),
        entries: vec![directory_entry()],
    });
    let account = Arc::new(FakeAccount);
    let inventory = Arc::new(FakeInventory {
        our_assets: our_assets.clone(),
        their_assets,
    });

    let lifecycle = LifecycleController::new(
        Arc::new(SystemClock),
        directory.clone(),
        account.clone(),
        inventory.clone(),
        "test-guid".to_string(),
    );

    let bot = bot();
    lifecycle
        .on_persona_state(&bot, Some("fixture-bot".to_string()), None)
        .await;

    assert!(*directory.announced.lock().unwrap(), "bot should have announced");
    let snapshot = lifecycle.snapshot().await;
    assert!(snapshot.should_send_heartbeats);

    let trade_offers = Arc::new(FakeTradeOffers {
        submitted: AtomicUsize::new(0),
    });
    let engine = MatchingEngine::new(
        inventory,
        directory,
        trade_offers.clone(),
        Arc::new(FakeConfirmations),
        account,
        Arc::new(FakeTradingLock),
        3,
        10,
    );

    let made_progress = engine.match_actively(&bot).await;

    assert_eq!(made_progress, Some(true));
    assert!(trade_offers.submitted.load(Ordering::SeqCst) >= 1);
}

#[test]
fn system_clock_advances() {
    let clock = SystemClock;
    let first = clock.now();
    let second = Utc::now();
    assert!(second >= first);
}
