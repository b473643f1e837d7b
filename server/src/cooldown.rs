//! Per-actor paint rate limiting.
//!
//! The ledger maps an actor id to the instant its cooldown expires. An entry
//! that exists and has not expired means the actor may not paint. Entries are
//! evicted lazily on lookup and in bulk by a periodic sweeper task, so the
//! table stays bounded by the set of recently active actors.

use dashmap::DashMap;
use log::debug;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

pub struct CooldownLedger {
    entries: DashMap<String, Instant>,
    ttl: Duration,
}

impl CooldownLedger {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// An empty actor id is never on cooldown — it cannot be fairly
    /// rate-limited, so it is also never settable.
    pub fn is_on_cooldown(&self, actor: &str) -> bool {
        if actor.is_empty() {
            return false;
        }

        let deadline = match self.entries.get(actor) {
            Some(entry) => *entry,
            None => return false,
        };

        if Instant::now() < deadline {
            return true;
        }

        self.entries.remove(actor);
        false
    }

    /// Marks the actor until `now + ttl`. No-op for empty actor ids.
    pub fn set_cooldown(&self, actor: &str) {
        if actor.is_empty() {
            return;
        }
        self.entries
            .insert(actor.to_string(), Instant::now() + self.ttl);
    }

    /// Drops every expired entry, returning how many were removed.
    pub fn sweep(&self) -> usize {
        let before = self.entries.len();
        let now = Instant::now();
        self.entries.retain(|_, deadline| *deadline > now);
        before.saturating_sub(self.entries.len())
    }

    /// Background eviction, in the same shape as the server's other
    /// housekeeping tasks.
    pub fn spawn_sweeper(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let removed = self.sweep();
                if removed > 0 {
                    debug!("swept {} expired cooldown entries", removed);
                }
            }
        })
    }
}
