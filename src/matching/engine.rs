//! C5: the active-matching engine (§4.5). Fetches the bot's own surplus,
//! pulls candidates off the public directory, and runs the bounded greedy
//! pair-finder against each one, submitting trade offers as it goes.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, trace, warn};

use crate::collaborators::{
    AccountCollaborator, ConfirmationCollaborator, ConfirmationKind, DirectoryCollaborator,
    InventoryCollaborator, TradeOfferCollaborator, TradingLockCollaborator,
};
use crate::eligibility;
use crate::model::{Asset, AssetType, BotConfig, ListedUser, SetKey};

use super::inventory::{build_state, has_surplus, InventoryState};
use super::pair_finder::find_pairs;

pub const MAX_MATCHED_BOTS_HARD: usize = 40;
pub const MAX_MATCHED_BOTS_SOFT: usize = 20;
pub const MAX_MATCHING_ROUNDS: u32 = 10;

const INTER_ROUND_SLEEP: std::time::Duration = std::time::Duration::from_secs(5 * 60);

/// A simple class_id-indexed pool of concrete owned assets, used to resolve a
/// `give`/`take` count proposal back into the actual asset instances a trade
/// offer must name (§4.5 step 7, "resolve give/take back to concrete asset
/// lists via the external trading helper").
struct AssetPool {
    by_class: BTreeMap<u64, Vec<Asset>>,
}

impl AssetPool {
    fn from_assets(assets: Vec<Asset>) -> Self {
        let mut by_class: BTreeMap<u64, Vec<Asset>> = BTreeMap::new();
        for asset in assets {
            by_class.entry(asset.class_id).or_default().push(asset);
        }
        Self { by_class }
    }

    /// Removes up to `count` units of `class_id`, splitting a partial stack
    /// if necessary. Returns fewer than `count` only if the pool has been
    /// exhausted, which should not happen as long as counts stay consistent
    /// with the pool's contents.
    fn take(&mut self, class_id: u64, mut count: u32) -> Vec<Asset> {
        let mut taken = Vec::new();
        if let Some(stack) = self.by_class.get_mut(&class_id) {
            while count > 0 {
                let Some(mut asset) = stack.pop() else {
                    break;
                };
                if asset.amount <= count {
                    count -= asset.amount;
                    taken.push(asset);
                } else {
                    asset.amount -= count;
                    let mut split = asset.clone();
                    split.amount = count;
                    stack.push(asset);
                    taken.push(split);
                    count = 0;
                }
            }
            if stack.is_empty() {
                self.by_class.remove(&class_id);
            }
        }
        taken
    }

    fn give_back(&mut self, asset: Asset) {
        self.by_class.entry(asset.class_id).or_default().push(asset);
    }

    fn resolve(&mut self, counts: &BTreeMap<u64, u32>) -> Vec<Asset> {
        counts
            .iter()
            .flat_map(|(&class_id, &count)| self.take(class_id, count))
            .collect()
    }
}

pub struct MatchingEngine {
    inventory: Arc<dyn InventoryCollaborator>,
    directory: Arc<dyn DirectoryCollaborator>,
    trade_offers: Arc<dyn TradeOfferCollaborator>,
    confirmations: Arc<dyn ConfirmationCollaborator>,
    account: Arc<dyn AccountCollaborator>,
    trading_lock: Arc<dyn TradingLockCollaborator>,
    match_actively_lock: AsyncMutex<()>,
    max_trades_per_account: u32,
    max_items_per_trade: u32,
}

impl MatchingEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        inventory: Arc<dyn InventoryCollaborator>,
        directory: Arc<dyn DirectoryCollaborator>,
        trade_offers: Arc<dyn TradeOfferCollaborator>,
        confirmations: Arc<dyn ConfirmationCollaborator>,
        account: Arc<dyn AccountCollaborator>,
        trading_lock: Arc<dyn TradingLockCollaborator>,
        max_trades_per_account: u32,
        max_items_per_trade: u32,
    ) -> Self {
        Self {
            inventory,
            directory,
            trade_offers,
            confirmations,
            account,
            trading_lock,
            match_actively_lock: AsyncMutex::new(()),
            max_trades_per_account,
            max_items_per_trade,
        }
    }

    /// Guards 1-5, then a non-blocking acquire of guard 6. Silently aborts if
    /// any guard fails or another pass is already in progress for this bot,
    /// returning `None`. Otherwise returns the `made_progress` outcome of the
    /// last round that ran, for the operability status endpoint (§10.5).
    pub async fn match_actively(&self, bot: &BotConfig) -> Option<bool> {
        if !self.guards_1_to_4_hold(bot).await {
            return None;
        }
        let accepted_types = bot.accepted_matchable_types();
        if accepted_types.is_empty() {
            return None;
        }

        let Ok(_guard) = self.match_actively_lock.try_lock() else {
            trace!(steam_id = bot.steam_id, "active-matching already in progress, skipping");
            return None;
        };

        let mut last_progress = None;
        for round_number in 1..=MAX_MATCHING_ROUNDS {
            if !self.guards_1_to_4_hold(bot).await {
                break;
            }

            let trading_guard = self.trading_lock.acquire_trading_lock().await;
            let made_progress = self.run_round(bot, &accepted_types).await;
            drop(trading_guard);
            last_progress = Some(made_progress);

            info!(
                steam_id = bot.steam_id,
                round_number, made_progress, "active-matching round complete"
            );

            if !made_progress {
                break;
            }
            if round_number < MAX_MATCHING_ROUNDS {
                tokio::time::sleep(INTER_ROUND_SLEEP).await;
            }
        }
        last_progress
    }

    async fn guards_1_to_4_hold(&self, bot: &BotConfig) -> bool {
        if !self.account.is_connected(bot.steam_id).await {
            return false;
        }
        if !bot.preferences.match_actively {
            return false;
        }
        if bot.preferences.match_everything {
            return false;
        }
        eligibility::eligible(bot, self.account.as_ref()).await
    }

    async fn run_round(&self, bot: &BotConfig, accepted_types: &[AssetType]) -> bool {
        let Ok(Some(own_assets)) = self
            .inventory
            .fetch_inventory(bot.steam_id, true, Some(accepted_types), None, &[])
            .await
        else {
            return false;
        };
        if own_assets.is_empty() {
            return false;
        }

        let mut our_state = build_state(&own_assets);
        if !has_surplus(&our_state) {
            return false;
        }
        let mut our_pool = AssetPool::from_assets(own_assets);

        let Some(directory_entries) = self.directory.fetch_bots().await else {
            return false;
        };
        if directory_entries.is_empty() {
            return false;
        }

        let mut candidates: Vec<ListedUser> = directory_entries
            .iter()
            .filter_map(ListedUser::decode)
            .filter(|u| u.match_everything && u.accepts_any(accepted_types) && !bot.is_blacklisted(u.steam_id))
            .collect();
        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        candidates.truncate(MAX_MATCHED_BOTS_HARD);

        let mut skipped_sets_round: HashSet<SetKey> = HashSet::new();
        let mut empty_matches: usize = 0;

        for candidate in &candidates {
            if our_state.is_empty() {
                break;
            }

            let wanted_sets: Vec<SetKey> = our_state
                .keys()
                .copied()
                .filter(|k| !skipped_sets_round.contains(k))
                .collect();
            if wanted_sets.is_empty() {
                break;
            }
            let skipped_sets_vec: Vec<SetKey> = skipped_sets_round.iter().copied().collect();

            let Ok(Some(their_assets)) = self
                .inventory
                .fetch_inventory(candidate.steam_id, true, None, Some(&wanted_sets), &skipped_sets_vec)
                .await
            else {
                continue;
            };
            if their_assets.is_empty() {
                continue;
            }

            let mut their_state = build_state(&their_assets);
            let mut their_pool = AssetPool::from_assets(their_assets);
            let mut skipped_sets_user: HashSet<SetKey> = HashSet::new();

            for _attempt in 0..self.max_trades_per_account {
                let (give_counts, take_counts) = self.propose_trade(
                    &candidate.matchable_types,
                    &mut our_state,
                    &mut their_state,
                    &skipped_sets_round,
                    &mut skipped_sets_user,
                );

                if give_counts.is_empty() && take_counts.is_empty() {
                    empty_matches += 1;
                    if empty_matches >= MAX_MATCHED_BOTS_SOFT {
                        skipped_sets_round.extend(skipped_sets_user.iter().copied());
                        return !skipped_sets_round.is_empty();
                    }
                    break;
                }
                empty_matches = 0;

                let give_assets = our_pool.resolve(&give_counts);
                let take_assets = their_pool.resolve(&take_counts);
                for asset in &take_assets {
                    our_pool.give_back(asset.clone());
                }

                let submission = self
                    .trade_offers
                    .submit_trade_offer(
                        candidate.steam_id,
                        &candidate.trade_token,
                        give_assets,
                        take_assets,
                        false,
                    )
                    .await;

                match submission {
                    Ok(result) if result.accepted => {
                        if bot.has_mobile_authenticator && !result.confirmation_ids.is_empty() {
                            let confirmed = self
                                .confirmations
                                .accept_confirmations(
                                    true,
                                    ConfirmationKind::Trade,
                                    bot.steam_id,
                                    &result.confirmation_ids,
                                    true,
                                )
                                .await
                                .unwrap_or(false);
                            if !confirmed {
                                warn!(
                                    steam_id = bot.steam_id,
                                    their_steam_id = candidate.steam_id,
                                    "mobile confirmation failed, aborting round"
                                );
                                return false;
                            }
                        }
                    }
                    Ok(_) | Err(_) => {
                        // Non-confirmation failure: per the documented Open
                        // Question decision, speculative state is retained
                        // and the next attempt proceeds with the updated
                        // counts.
                        trace!(
                            steam_id = bot.steam_id,
                            their_steam_id = candidate.steam_id,
                            "trade offer submission did not succeed, continuing"
                        );
                    }
                }
            }

            for key in &skipped_sets_user {
                our_state.remove(key);
            }
            skipped_sets_round.extend(skipped_sets_user);
            if !has_surplus(&our_state) {
                break;
            }
        }

        !skipped_sets_round.is_empty()
    }

    /// One trade-offer attempt: run the greedy pair-finder across every
    /// eligible set key, stopping once the per-trade item cap is reached.
    fn propose_trade(
        &self,
        their_matchable_types: &[AssetType],
        our_state: &mut InventoryState,
        their_state: &mut InventoryState,
        skipped_sets_round: &HashSet<SetKey>,
        skipped_sets_user: &mut HashSet<SetKey>,
    ) -> (BTreeMap<u64, u32>, BTreeMap<u64, u32>) {
        let mut give = BTreeMap::new();
        let mut take = BTreeMap::new();
        let mut items_in_trade: u32 = 0;

        let eligible_sets: Vec<SetKey> = our_state
            .keys()
            .copied()
            .filter(|key| !skipped_sets_round.contains(key))
            .filter(|key| their_matchable_types.contains(&key.asset_type))
            .filter(|key| their_state.contains_key(key))
            .filter(|key| our_state[key].values().any(|&count| count > 1))
            .collect();

        for set_key in eligible_sets {
            if items_in_trade >= self.max_items_per_trade.saturating_sub(1) {
                break;
            }
            let ours = our_state.get_mut(&set_key).expect("checked above");
            let theirs = their_state.get_mut(&set_key).expect("checked above");

            let accepted_any = find_pairs(
                ours,
                theirs,
                &mut give,
                &mut take,
                &mut items_in_trade,
                self.max_items_per_trade,
            );
            if accepted_any {
                skipped_sets_user.insert(set_key);
            }
        }

        (give, take)
    }
}
