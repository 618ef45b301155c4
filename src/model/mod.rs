//! Data model: assets, directory entries, and per-bot configuration (§3).

pub mod asset;
pub mod bot_config;
pub mod listed_user;

pub use asset::{Asset, AssetType, SetKey};
pub use bot_config::{BotConfig, TradingPreferences};
pub use listed_user::ListedUser;
