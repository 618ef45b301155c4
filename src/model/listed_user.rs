//! C1: decoding of one `/Api/Bots` directory entry into a `ListedUser`.

use serde::Deserialize;
use tracing::warn;

use super::asset::{AssetType, SetKey};

/// Raw on-the-wire shape of one directory entry. All fields are required;
/// a missing field fails `serde_json` deserialization of this struct, which
/// is exactly the "missing field fails the entry" rule from the spec.
#[derive(Debug, Deserialize)]
struct RawListedUser {
    steam_id: u64,
    trade_token: String,
    games_count: u32,
    items_count: u32,
    match_everything: u8,
    matchable_backgrounds: u8,
    matchable_cards: u8,
    matchable_foil_cards: u8,
    matchable_emoticons: u8,
}

/// Parsed, validated view of one directory entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ListedUser {
    pub steam_id: u64,
    pub trade_token: String,
    pub games_count: u32,
    pub items_count: u32,
    pub match_everything: bool,
    pub matchable_types: Vec<AssetType>,
    /// `games_count / items_count`, computed once and cached.
    pub score: f64,
}

impl ListedUser {
    /// Decode one directory entry. Returns `None` (after logging a warning)
    /// if the entry is structurally invalid or has `items_count == 0`; never
    /// fails the whole `/Api/Bots` fetch.
    pub fn decode(entry: &serde_json::Value) -> Option<ListedUser> {
        let raw: RawListedUser = match serde_json::from_value(entry.clone()) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, "dropping directory entry with missing/malformed fields");
                return None;
            }
        };

        if raw.items_count == 0 {
            warn!(
                steam_id = raw.steam_id,
                "dropping directory entry with items_count = 0"
            );
            return None;
        }

        let match_everything = Self::tolerant_bool(raw.steam_id, "match_everything", raw.match_everything);

        let mut matchable_types = Vec::with_capacity(4);
        if Self::tolerant_bool(raw.steam_id, "matchable_cards", raw.matchable_cards) {
            matchable_types.push(AssetType::TradingCard);
        }
        if Self::tolerant_bool(raw.steam_id, "matchable_foil_cards", raw.matchable_foil_cards) {
            matchable_types.push(AssetType::FoilTradingCard);
        }
        if Self::tolerant_bool(raw.steam_id, "matchable_emoticons", raw.matchable_emoticons) {
            matchable_types.push(AssetType::Emoticon);
        }
        if Self::tolerant_bool(
            raw.steam_id,
            "matchable_backgrounds",
            raw.matchable_backgrounds,
        ) {
            matchable_types.push(AssetType::ProfileBackground);
        }

        let score = raw.games_count as f64 / raw.items_count as f64;

        Some(ListedUser {
            steam_id: raw.steam_id,
            trade_token: raw.trade_token,
            games_count: raw.games_count,
            items_count: raw.items_count,
            match_everything,
            matchable_types,
            score,
        })
    }

    /// `0`/`1` map to `false`/`true`. Any other value is treated as `false`
    /// and logged, without rejecting the enclosing record.
    fn tolerant_bool(steam_id: u64, field: &str, value: u8) -> bool {
        match value {
            0 => false,
            1 => true,
            other => {
                warn!(steam_id, field, value = other, "non-boolean directory field, treating as 0");
                false
            }
        }
    }

    pub fn matchable_set_keys(&self, real_app_id: u32) -> Vec<SetKey> {
        self.matchable_types
            .iter()
            .map(|&t| SetKey::new(real_app_id, t))
            .collect()
    }

    pub fn accepts_any(&self, types: &[AssetType]) -> bool {
        self.matchable_types.iter().any(|t| types.contains(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_entry() -> serde_json::Value {
        json!({
            "steam_id": 76561198000000000u64,
            "trade_token": "ABC1",
            "games_count": 50,
            "items_count": 250,
            "match_everything": 1,
            "matchable_backgrounds": 1,
            "matchable_cards": 1,
            "matchable_foil_cards": 0,
            "matchable_emoticons": 1,
        })
    }

    #[test]
    fn decodes_valid_entry() {
        let user = ListedUser::decode(&valid_entry()).expect("should decode");
        assert_eq!(user.steam_id, 76561198000000000);
        assert_eq!(user.trade_token, "ABC1");
        assert!(user.match_everything);
        assert_eq!(user.score, 50.0 / 250.0);
        assert!(user.matchable_types.contains(&AssetType::TradingCard));
        assert!(!user.matchable_types.contains(&AssetType::FoilTradingCard));
    }

    #[test]
    fn missing_field_rejects_entry() {
        let mut entry = valid_entry();
        entry.as_object_mut().unwrap().remove("trade_token");
        assert!(ListedUser::decode(&entry).is_none());
    }

    #[test]
    fn zero_items_count_rejects_entry() {
        let mut entry = valid_entry();
        entry["items_count"] = json!(0);
        assert!(ListedUser::decode(&entry).is_none());
    }

    #[test]
    fn non_boolean_matchable_field_drops_type_but_keeps_record() {
        let mut entry = valid_entry();
        entry["matchable_cards"] = json!(7);
        let user = ListedUser::decode(&entry).expect("record should survive");
        assert!(!user.matchable_types.contains(&AssetType::TradingCard));
    }

    #[test]
    fn round_trip_preserves_matchable_types_and_flag() {
        let user = ListedUser::decode(&valid_entry()).unwrap();
        let reencoded: Vec<u8> = AssetType::MATCHABLE
            .iter()
            .map(|t| u8::from(user.matchable_types.contains(t)))
            .collect();
        let original: Vec<u8> = vec![1, 0, 1, 1];
        assert_eq!(reencoded, original);
        assert!(user.match_everything);
    }
}
