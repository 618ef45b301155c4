//! Per-bot configuration: trading preferences, matchable-type selection, and
//! the local trade blacklist consulted during candidate selection (§4.5
//! step 5, supplemented per SPEC_FULL.md §10.6).

use serde::Deserialize;
use std::collections::HashSet;

use super::asset::AssetType;

/// The subset of an agent's trading preferences this module cares about.
/// Named after the flags the spec references directly; unrelated
/// preferences the surrounding agent may have are out of scope here.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct TradingPreferences {
    /// Opts the bot into the directory/announcement lifecycle at all.
    pub steam_trade_matcher: bool,
    /// Opts the bot into the active-matching engine (C5).
    pub match_actively: bool,
    /// A different subsystem (not this one) that accepts any 1-for-1 trade.
    pub match_everything: bool,
}

/// One bot's static configuration, as loaded from its TOML config section.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    pub steam_id: u64,
    #[serde(default)]
    pub nickname: Option<String>,
    pub preferences: TradingPreferences,
    #[serde(default = "default_matchable_types")]
    pub matchable_types: Vec<AssetType>,
    pub has_mobile_authenticator: bool,
    #[serde(default)]
    pub trade_blacklist: HashSet<u64>,
}

fn default_matchable_types() -> Vec<AssetType> {
    AssetType::MATCHABLE.to_vec()
}

impl BotConfig {
    /// The bot's configured matchable types, intersected with the directory's
    /// globally accepted set (§4.2 step 3, §4.5 guard 5).
    pub fn accepted_matchable_types(&self) -> Vec<AssetType> {
        self.matchable_types
            .iter()
            .copied()
            .filter(|t| AssetType::MATCHABLE.contains(t))
            .collect()
    }

    pub fn is_blacklisted(&self, steam_id: u64) -> bool {
        self.trade_blacklist.contains(&steam_id)
    }
}
