//! Steam Match Bot — process entry point.
//!
//! Wires up one `LifecycleController` + `MatchingEngine` + `MatchingTrigger`
//! per configured bot, serves the minimal operability API (§10.5), and
//! shuts everything down deterministically on SIGINT/SIGTERM.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use steam_match_bot::api::{router, AppState, BotHandle};
use steam_match_bot::clock::SystemClock;
use steam_match_bot::collaborators::{
    AccountCollaborator, ConfirmationCollaborator, ConfirmationKind, InventoryCollaborator,
    TradeOfferCollaborator, TradeSubmission, TradingLockCollaborator, TradingLockGuard,
};
use steam_match_bot::config::{load_bot_configs, ProcessConfig};
use steam_match_bot::directory_client::DirectoryClient;
use steam_match_bot::matching::MatchingEngine;
use steam_match_bot::model::{Asset, AssetType, SetKey};
use steam_match_bot::trigger::MatchStatus;
use steam_match_bot::{LifecycleController, MatchingTrigger};

/// Every Steam-session-facing collaborator (inventory, trade offers,
/// confirmations, account checks, the agent-wide trading lock) is owned by
/// the surrounding bot framework, not this module (§6). This binary is a
/// standalone demonstration of the wiring; a production deployment embeds
/// `steam_match_bot` as a library and substitutes real implementations here.
struct HostNotIntegrated;

#[async_trait]
impl InventoryCollaborator for HostNotIntegrated {
    async fn fetch_inventory(
        &self,
        steam_id: u64,
        _tradable_only: bool,
        _wanted_types: Option<&[AssetType]>,
        _wanted_sets: Option<&[SetKey]>,
        _skipped_sets: &[SetKey],
    ) -> Result<Option<Vec<Asset>>> {
        warn!(steam_id, "inventory collaborator not wired up to a real Steam session");
        Ok(None)
    }
}

#[async_trait]
impl TradeOfferCollaborator for HostNotIntegrated {
    async fn submit_trade_offer(
        &self,
        recipient_steam_id: u64,
        _recipient_trade_token: &str,
        _give: Vec<Asset>,
        _take: Vec<Asset>,
        _bypass_escrow_checks: bool,
    ) -> Result<TradeSubmission> {
        warn!(recipient_steam_id, "trade-offer collaborator not wired up to a real Steam session");
        Ok(TradeSubmission::default())
    }
}

#[async_trait]
impl ConfirmationCollaborator for HostNotIntegrated {
    async fn accept_confirmations(
        &self,
        _accept: bool,
        _kind: ConfirmationKind,
        actor_steam_id: u64,
        _ids: &[u64],
        _wait_if_needed: bool,
    ) -> Result<bool> {
        warn!(actor_steam_id, "confirmation collaborator not wired up to a real mobile authenticator");
        Ok(false)
    }
}

#[async_trait]
impl AccountCollaborator for HostNotIntegrated {
    async fn is_connected(&self, _steam_id: u64) -> bool {
        false
    }
    async fn has_valid_api_key(&self, _steam_id: u64) -> bool {
        false
    }
    async fn is_inventory_public(&self, _steam_id: u64) -> bool {
        false
    }
    async fn own_trade_token(&self, _steam_id: u64) -> Result<String> {
        Ok(String::new())
    }
    async fn request_persona_state(&self, _steam_id: u64) -> Result<()> {
        Ok(())
    }
    async fn join_group(&self, _steam_id: u64, _group_id: u64) -> Result<()> {
        Ok(())
    }
}

struct NoOpGuard;
impl TradingLockGuard for NoOpGuard {}

#[async_trait]
impl TradingLockCollaborator for HostNotIntegrated {
    async fn acquire_trading_lock(&self) -> Box<dyn TradingLockGuard> {
        Box::new(NoOpGuard)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let process_config = ProcessConfig::from_env().context("failed to load process configuration")?;
    let bot_configs = load_bot_configs(&process_config.bots_config_path)
        .context("failed to load bot configuration file")?;

    info!(
        bot_count = bot_configs.len(),
        guid = %process_config.guid,
        "starting steam-match-bot"
    );

    let host: Arc<HostNotIntegrated> = Arc::new(HostNotIntegrated);
    let directory: Arc<DirectoryClient> = Arc::new(DirectoryClient::new(process_config.directory_base_url.clone()));

    let mut bots = HashMap::with_capacity(bot_configs.len());
    let mut triggers = Vec::with_capacity(bot_configs.len());

    for (index, bot_config) in bot_configs.into_iter().enumerate() {
        let bot = Arc::new(bot_config);

        let lifecycle = Arc::new(LifecycleController::new(
            Arc::new(SystemClock),
            directory.clone(),
            host.clone(),
            host.clone(),
            process_config.guid.clone(),
        ));

        let engine = Arc::new(MatchingEngine::new(
            host.clone(),
            directory.clone(),
            host.clone(),
            host.clone(),
            host.clone(),
            host.clone(),
            5,
            40,
        ));

        let match_status = MatchStatus::new();
        let trigger = MatchingTrigger::schedule(
            engine,
            bot.clone(),
            match_status.clone(),
            process_config.load_balancing_delay_seconds,
            index as u64,
        );
        triggers.push(trigger);

        bots.insert(
            bot.steam_id,
            BotHandle {
                config: bot,
                lifecycle,
                match_status,
            },
        );
    }

    let state = AppState { bots: Arc::new(bots) };
    // Order matters - applied bottom-to-top.
    let app = router(state)
        .layer(CorsLayer::permissive())
        .layer(axum::middleware::from_fn(
            steam_match_bot::middleware::request_logging_simple,
        ));

    let addr = format!("0.0.0.0:{}", process_config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "operability API listening");

    let shutdown = tokio::signal::ctrl_c();
    tokio::select! {
        result = axum::serve(listener, app) => {
            result.context("operability server error")?;
        }
        _ = shutdown => {
            info!("shutdown signal received, cancelling matching triggers");
        }
    }

    for trigger in triggers {
        trigger.cancel();
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "steam_match_bot=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
