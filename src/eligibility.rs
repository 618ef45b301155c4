//! C2: the eligibility oracle (§4.2). A pure, uncached predicate re-evaluated
//! on every call — the caller decides when "next tick" is.

use crate::collaborators::AccountCollaborator;
use crate::model::{AssetType, BotConfig};

/// Evaluates the five eligibility steps in order with short-circuit
/// semantics. Steps 4 and 5 are remote checks that report `false` rather
/// than erroring on transient failure (§4.2); this function never returns
/// an `Err` for that reason — ineligibility and transient unavailability
/// are indistinguishable to the caller, as specified.
pub async fn eligible(bot: &BotConfig, account: &dyn AccountCollaborator) -> bool {
    if !bot.has_mobile_authenticator {
        return false;
    }
    if !bot.preferences.steam_trade_matcher {
        return false;
    }
    if !intersects_accepted(&bot.matchable_types) {
        return false;
    }
    if !account.is_inventory_public(bot.steam_id).await {
        return false;
    }
    if !account.has_valid_api_key(bot.steam_id).await {
        return false;
    }
    true
}

fn intersects_accepted(configured: &[AssetType]) -> bool {
    configured.iter().any(|t| AssetType::MATCHABLE.contains(t))
}
