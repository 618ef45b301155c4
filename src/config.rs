//! Process-wide configuration (env) and per-bot configuration (TOML), plus
//! the persistent installation `Guid` (§10.3).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use uuid::Uuid;

use crate::model::BotConfig;

/// Settings read once at startup and shared by every bot in the process.
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    pub port: u16,
    pub directory_base_url: String,
    pub load_balancing_delay_seconds: u64,
    pub bots_config_path: PathBuf,
    pub guid: String,
}

impl ProcessConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .unwrap_or(8080);

        let directory_base_url = std::env::var("DIRECTORY_BASE_URL")
            .unwrap_or_else(|_| "https://directory.steam-trading.invalid".to_string());

        let load_balancing_delay_seconds = std::env::var("LOAD_BALANCING_DELAY_SECONDS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .unwrap_or(5);

        let bots_config_path: PathBuf = std::env::var("BOTS_CONFIG_PATH")
            .unwrap_or_else(|_| "./bots.toml".to_string())
            .into();

        let guid_path: PathBuf = std::env::var("GUID_PATH")
            .unwrap_or_else(|_| "./guid.txt".to_string())
            .into();
        let guid = load_or_create_guid(&guid_path)?;

        Ok(Self {
            port,
            directory_base_url,
            load_balancing_delay_seconds,
            bots_config_path,
            guid,
        })
    }
}

/// Reads the persistent installation Guid, generating and writing one on
/// first run so it survives restarts (§6 "process-wide state").
fn load_or_create_guid(path: &Path) -> anyhow::Result<String> {
    if let Ok(existing) = fs::read_to_string(path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }

    let guid = Uuid::new_v4().to_string();
    fs::write(path, &guid)
        .with_context(|| format!("failed to persist installation guid to {}", path.display()))?;
    Ok(guid)
}

#[derive(Debug, Deserialize)]
struct BotsFile {
    #[serde(rename = "bot")]
    bots: Vec<BotConfig>,
}

/// Loads every configured bot from one TOML file containing a `[[bot]]`
/// array of tables.
pub fn load_bot_configs(path: &Path) -> anyhow::Result<Vec<BotConfig>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read bot config file {}", path.display()))?;
    let parsed: BotsFile = toml::from_str(&contents)
        .with_context(|| format!("failed to parse bot config file {}", path.display()))?;
    Ok(parsed.bots)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[[bot]]
steam_id = 1
nickname = "main"
has_mobile_authenticator = true

[bot.preferences]
steam_trade_matcher = true
match_actively = true
match_everything = false

[[bot]]
steam_id = 2
has_mobile_authenticator = false

[bot.preferences]
steam_trade_matcher = false
match_actively = false
match_everything = false
"#;

    #[test]
    fn loads_multiple_bots_from_one_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bots.toml");
        fs::write(&path, SAMPLE).unwrap();

        let bots = load_bot_configs(&path).unwrap();

        assert_eq!(bots.len(), 2);
        assert_eq!(bots[0].steam_id, 1);
        assert_eq!(bots[0].nickname.as_deref(), Some("main"));
        assert!(bots[0].preferences.match_actively);
        assert!(!bots[1].has_mobile_authenticator);
    }

    #[test]
    fn guid_is_generated_once_and_persisted_across_calls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guid.txt");

        let first = load_or_create_guid(&path).unwrap();
        let second = load_or_create_guid(&path).unwrap();

        assert_eq!(first, second);
        assert!(!first.is_empty());
    }
}
