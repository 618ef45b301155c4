//! C4: the periodic trigger that fires `match_actively` on a fixed cadence
//! with a per-bot startup offset (§4.4).

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::info;

use crate::matching::engine::MatchingEngine;
use crate::model::BotConfig;

pub const INITIAL_DELAY_BASE: StdDuration = StdDuration::from_secs(60 * 60);
pub const PERIOD: StdDuration = StdDuration::from_secs(8 * 60 * 60);

/// Timestamp and outcome of the most recent active-matching round, exposed
/// read-only through the `/status` operability endpoint (§10.5).
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MatchRoundRecord {
    pub at: DateTime<Utc>,
    pub made_progress: bool,
}

/// Shared slot a `MatchingTrigger` publishes its outcome into and `/status`
/// reads from. Deliberately not part of the testable core: this is ambient
/// observability, not a matching invariant.
#[derive(Default)]
pub struct MatchStatus {
    last_round: Mutex<Option<MatchRoundRecord>>,
}

impl MatchStatus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn snapshot(&self) -> Option<MatchRoundRecord> {
        *self.last_round.lock()
    }

    fn record(&self, made_progress: bool) {
        *self.last_round.lock() = Some(MatchRoundRecord {
            at: Utc::now(),
            made_progress,
        });
    }
}

/// A cancellable handle to the scheduled `match_actively` task.
pub struct MatchingTrigger {
    handle: JoinHandle<()>,
}

impl MatchingTrigger {
    /// Schedules `engine.match_actively(bot)` to run once after
    /// `1 hour + load_balancing_delay_seconds * bot_index`, then every
    /// 8 hours thereafter, until cancelled.
    pub fn schedule(
        engine: Arc<MatchingEngine>,
        bot: Arc<BotConfig>,
        status: Arc<MatchStatus>,
        load_balancing_delay_seconds: u64,
        bot_index: u64,
    ) -> Self {
        let initial_delay = INITIAL_DELAY_BASE
            + StdDuration::from_secs(load_balancing_delay_seconds * bot_index);

        let handle = tokio::spawn(async move {
            tokio::time::sleep(initial_delay).await;

            let mut ticker = tokio::time::interval(PERIOD);
            // The first tick fires immediately; we already waited out the
            // startup delay above, so consume it without an extra sleep.
            ticker.tick().await;

            loop {
                info!(steam_id = bot.steam_id, "periodic active-matching trigger firing");
                if let Some(made_progress) = engine.match_actively(&bot).await {
                    status.record(made_progress);
                }
                ticker.tick().await;
            }
        });

        Self { handle }
    }

    /// Cancels the timer. In-flight HTTP calls and the inter-round sleep
    /// inside `match_actively` are aborted along with the task (§5).
    pub fn cancel(self) {
        self.handle.abort();
    }
}
