//! The greedy pair-finder for a single set key (§4.5 "Greedy pair-finder").
//!
//! This is the linchpin of the whole module: every accepted swap strictly
//! reduces the imbalance of the set without ever growing an already-dominant
//! class (the acceptance test in `find_pairs`), so repeated application can
//! never regress the bot's own distribution.

use std::collections::BTreeMap;

use super::inventory::ClassCounts;

/// Repeatedly finds and applies improving `(our_item, their_item)` swaps for
/// one set key, mutating `ours`/`theirs` in place and accumulating the
/// resulting `give`/`take` proposal. Stops when no further pair passes the
/// acceptance test, or when `*items_in_trade` would reach
/// `max_items_per_trade - 1`.
///
/// Returns `true` if at least one pair was accepted (the caller uses this to
/// decide whether to add the set key to `skipped_sets_user`).
pub fn find_pairs(
    ours: &mut ClassCounts,
    theirs: &mut ClassCounts,
    give: &mut BTreeMap<u64, u32>,
    take: &mut BTreeMap<u64, u32>,
    items_in_trade: &mut u32,
    max_items_per_trade: u32,
) -> bool {
    let cap = max_items_per_trade.saturating_sub(1);
    let mut accepted_any = false;

    loop {
        if *items_in_trade >= cap {
            break;
        }

        match best_pair(ours, theirs) {
            Some((our_id, their_id)) => {
                *give.entry(our_id).or_insert(0) += 1;
                *take.entry(their_id).or_insert(0) += 1;

                decrement_or_remove(ours, our_id, 1);
                *ours.entry(their_id).or_insert(0) += 1;
                decrement_or_remove(theirs, their_id, 1);

                *items_in_trade += 2;
                accepted_any = true;
            }
            None => break,
        }
    }

    accepted_any
}

/// Our classes with count > 1, ordered by count descending (class_id
/// ascending as the deterministic secondary key), crossed with their
/// classes ordered by our current holdings ascending (class_id ascending
/// secondary), returning the first accepted pair.
fn best_pair(ours: &ClassCounts, theirs: &ClassCounts) -> Option<(u64, u64)> {
    let mut our_candidates: Vec<(u64, u32)> = ours
        .iter()
        .filter(|&(_, &count)| count > 1)
        .map(|(&id, &count)| (id, count))
        .collect();
    our_candidates.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    for (our_id, our_count) in our_candidates {
        let mut their_candidates: Vec<u64> = theirs.keys().copied().collect();
        their_candidates.sort_by(|&a, &b| {
            let ours_a = ours.get(&a).copied().unwrap_or(0);
            let ours_b = ours.get(&b).copied().unwrap_or(0);
            ours_a.cmp(&ours_b).then(a.cmp(&b))
        });

        for their_id in their_candidates {
            let our_amount_of_their_item = ours.get(&their_id).copied().unwrap_or(0);
            if our_count > our_amount_of_their_item + 1 {
                return Some((our_id, their_id));
            }
        }
    }

    None
}

fn decrement_or_remove(map: &mut ClassCounts, key: u64, amount: u32) {
    if let Some(count) = map.get_mut(&key) {
        if *count <= amount {
            map.remove(&key);
        } else {
            *count -= amount;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pairs: &[(u64, u32)]) -> ClassCounts {
        pairs.iter().copied().collect()
    }

    #[test]
    fn empty_round_when_no_pair_improves() {
        // Scenario 4: own {1->3, 2->1}, their {1->5}.
        let mut ours = counts(&[(1, 3), (2, 1)]);
        let mut theirs = counts(&[(1, 5)]);
        let mut give = BTreeMap::new();
        let mut take = BTreeMap::new();
        let mut items_in_trade = 0;

        let accepted = find_pairs(&mut ours, &mut theirs, &mut give, &mut take, &mut items_in_trade, 10);

        assert!(!accepted);
        assert!(give.is_empty());
        assert!(take.is_empty());
    }

    #[test]
    fn single_swap_accepted() {
        // Scenario 5: own {A(1)->3, B(2)->1}, their {B(2)->2, C(3)->1}.
        let mut ours = counts(&[(1, 3), (2, 1)]);
        let mut theirs = counts(&[(2, 2), (3, 1)]);
        let mut give = BTreeMap::new();
        let mut take = BTreeMap::new();
        let mut items_in_trade = 0;

        let accepted = find_pairs(&mut ours, &mut theirs, &mut give, &mut take, &mut items_in_trade, 10);

        assert!(accepted);
        assert_eq!(give, counts(&[(1, 1)]).into_iter().collect());
        assert_eq!(take, counts(&[(2, 1)]).into_iter().collect());
        assert_eq!(ours, counts(&[(1, 2), (2, 2)]));
        assert_eq!(theirs, counts(&[(2, 1), (3, 1)]));
        assert_eq!(items_in_trade, 2);
    }

    #[test]
    fn respects_max_items_per_trade_cap() {
        let mut ours = counts(&[(1, 10)]);
        let mut theirs = counts(&[(2, 1), (3, 1), (4, 1)]);
        let mut give = BTreeMap::new();
        let mut take = BTreeMap::new();
        let mut items_in_trade = 0;

        // cap - 1 = 2, so only one pair (2 items) should be accepted.
        find_pairs(&mut ours, &mut theirs, &mut give, &mut take, &mut items_in_trade, 3);

        assert_eq!(items_in_trade, 2);
        assert_eq!(give.values().sum::<u32>(), 1);
    }

    #[test]
    fn never_reduces_distinct_class_count_held() {
        // Every accepted swap removes a duplicate (count > 1 before) and
        // adds an item of a class we strictly have fewer of; the set of
        // distinct classes we hold can only grow or stay the same.
        let mut ours = counts(&[(1, 5)]);
        let mut theirs = counts(&[(2, 1), (3, 1), (4, 1), (5, 1)]);
        let distinct_before = ours.len();

        let mut give = BTreeMap::new();
        let mut take = BTreeMap::new();
        let mut items_in_trade = 0;
        find_pairs(&mut ours, &mut theirs, &mut give, &mut take, &mut items_in_trade, 100);

        assert!(ours.len() >= distinct_before);
    }
}
