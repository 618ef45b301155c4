//! Asset and set-key types.
//!
//! An `Asset` is an immutable value describing one stack of items in a Steam
//! inventory. Matching only ever cares about a closed subset of item types;
//! everything else is represented but ignored at every boundary.

use serde::{Deserialize, Serialize};

/// Item category as reported by the Steam inventory API.
///
/// Only the four `Matchable*` variants participate in directory matching; all
/// other categories are kept as `Other` so the type remains forward
/// compatible with item types this module has no opinion about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    TradingCard,
    FoilTradingCard,
    Emoticon,
    ProfileBackground,
    Other,
}

impl AssetType {
    /// The four categories the directory accepts, in the directory's numeric
    /// wire encoding (see `ListedUser`/announcement payload).
    pub const MATCHABLE: [AssetType; 4] = [
        AssetType::TradingCard,
        AssetType::FoilTradingCard,
        AssetType::Emoticon,
        AssetType::ProfileBackground,
    ];

    pub fn is_matchable(self) -> bool {
        !matches!(self, AssetType::Other)
    }

    /// Numeric code used when serializing `MatchableTypes` for `/Api/Announce`.
    pub fn wire_code(self) -> u8 {
        match self {
            AssetType::TradingCard => 1,
            AssetType::FoilTradingCard => 2,
            AssetType::Emoticon => 3,
            AssetType::ProfileBackground => 4,
            AssetType::Other => 0,
        }
    }
}

/// `(real_app_id, type)` — the unit of matching. Two assets trade only if
/// they share a set key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SetKey {
    pub real_app_id: u32,
    pub asset_type: AssetType,
}

impl SetKey {
    pub fn new(real_app_id: u32, asset_type: AssetType) -> Self {
        Self {
            real_app_id,
            asset_type,
        }
    }
}

// AssetType needs a total order for SetKey to derive Ord.
impl PartialOrd for AssetType {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AssetType {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.wire_code().cmp(&other.wire_code())
    }
}

/// One stack of an item template in a Steam inventory.
///
/// Immutable by convention: matching code never mutates an `Asset`, only the
/// tabular counts derived from a collection of them (see `matching::inventory`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub class_id: u64,
    pub real_app_id: u32,
    pub asset_type: AssetType,
    pub amount: u32,
    /// Opaque identifier used only by the trade-offer collaborator to build
    /// the concrete give/take asset lists; matching logic never inspects it.
    pub asset_id: String,
}

impl Asset {
    pub fn set_key(&self) -> SetKey {
        SetKey::new(self.real_app_id, self.asset_type)
    }
}
