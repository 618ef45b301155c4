//! Builds the tabular `set_key -> class_id -> count` inventory state used by
//! the matching engine (§3, §9 "graph-free matching"). Purely functional:
//! no cyclic references, nothing owns anything beyond the maps themselves.

use std::collections::BTreeMap;

use crate::model::{Asset, SetKey};

/// `class_id -> count`, ordered by `class_id` so pair-finder iteration is
/// deterministic on tie-breaks (SPEC_FULL.md §9 open question).
pub type ClassCounts = BTreeMap<u64, u32>;

/// `set_key -> class_id -> count`.
pub type InventoryState = BTreeMap<SetKey, ClassCounts>;

/// Groups a flat list of assets into the two-level inventory state.
pub fn build_state(assets: &[Asset]) -> InventoryState {
    let mut state: InventoryState = BTreeMap::new();
    for asset in assets {
        let counts = state.entry(asset.set_key()).or_default();
        *counts.entry(asset.class_id).or_insert(0) += asset.amount;
    }
    state
}

/// Whether any set in the state contains a class held in more than one copy.
pub fn has_surplus(state: &InventoryState) -> bool {
    state
        .values()
        .any(|classes| classes.values().any(|&count| count > 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AssetType;

    fn asset(class_id: u64, app: u32, t: AssetType, amount: u32) -> Asset {
        Asset {
            class_id,
            real_app_id: app,
            asset_type: t,
            amount,
            asset_id: format!("{class_id}-{app}"),
        }
    }

    #[test]
    fn groups_by_set_key_and_sums_amounts() {
        let assets = vec![
            asset(1, 730, AssetType::TradingCard, 1),
            asset(1, 730, AssetType::TradingCard, 2),
            asset(2, 730, AssetType::TradingCard, 1),
            asset(3, 730, AssetType::Emoticon, 1),
        ];
        let state = build_state(&assets);
        let key_cards = SetKey::new(730, AssetType::TradingCard);
        let key_emoticons = SetKey::new(730, AssetType::Emoticon);

        assert_eq!(state[&key_cards][&1], 3);
        assert_eq!(state[&key_cards][&2], 1);
        assert_eq!(state[&key_emoticons][&3], 1);
    }

    #[test]
    fn has_surplus_detects_any_count_above_one() {
        let no_surplus = build_state(&[asset(1, 730, AssetType::TradingCard, 1)]);
        assert!(!has_surplus(&no_surplus));

        let surplus = build_state(&[
            asset(1, 730, AssetType::TradingCard, 1),
            asset(1, 730, AssetType::TradingCard, 1),
        ]);
        assert!(has_surplus(&surplus));
    }
}
