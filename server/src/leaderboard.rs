//! Contribution leaderboard: paint counts and display nicknames.
//!
//! Scores only ever go up, one increment per accepted paint. Nicknames are
//! display metadata keyed by the same actor id, latest write wins. The two
//! tables are updated independently; a concurrent reader may briefly observe
//! a new score with an old nickname, which is acceptable.

use crate::persistence::{LeaderboardSnapshot, PersistCommand};
use dashmap::DashMap;
use log::warn;
use shared::{LeaderboardRow, UNKNOWN_NICKNAME};
use tokio::sync::mpsc::UnboundedSender;

pub struct Leaderboard {
    scores: DashMap<String, u64>,
    nicknames: DashMap<String, String>,
    persist_tx: Option<UnboundedSender<PersistCommand>>,
}

impl Leaderboard {
    pub fn new() -> Self {
        Self {
            scores: DashMap::new(),
            nicknames: DashMap::new(),
            persist_tx: None,
        }
    }

    pub fn with_persistence(persist_tx: UnboundedSender<PersistCommand>) -> Self {
        Self {
            scores: DashMap::new(),
            nicknames: DashMap::new(),
            persist_tx: Some(persist_tx),
        }
    }

    /// Adopts tables recovered from the backing store at startup.
    pub fn restore(&self, snapshot: LeaderboardSnapshot) {
        for (actor, score) in snapshot.scores {
            self.scores.insert(actor, score);
        }
        for (actor, nickname) in snapshot.nicknames {
            self.nicknames.insert(actor, nickname);
        }
    }

    pub fn export(&self) -> LeaderboardSnapshot {
        LeaderboardSnapshot {
            scores: self
                .scores
                .iter()
                .map(|e| (e.key().clone(), *e.value()))
                .collect(),
            nicknames: self
                .nicknames
                .iter()
                .map(|e| (e.key().clone(), e.value().clone()))
                .collect(),
        }
    }

    /// Upserts the nickname, then increments the actor's score by one.
    /// An empty nickname never overwrites a previously recorded one.
    pub fn record_paint(&self, actor: &str, nickname: &str) {
        if actor.is_empty() {
            return;
        }

        let nickname = nickname.trim();
        if !nickname.is_empty() {
            self.nicknames.insert(actor.to_string(), nickname.to_string());
        }
        *self.scores.entry(actor.to_string()).or_insert(0) += 1;

        if let Some(tx) = &self.persist_tx {
            if tx.send(PersistCommand::SaveScores(self.export())).is_err() {
                warn!("persistence task gone; leaderboard changes not durable");
            }
        }
    }

    pub fn score(&self, actor: &str) -> u64 {
        self.scores.get(actor).map(|e| *e.value()).unwrap_or(0)
    }

    /// Up to `n` rows, highest score first. Ties break on actor id so the
    /// ordering is deterministic across calls.
    pub fn top(&self, n: usize) -> Vec<LeaderboardRow> {
        let mut entries: Vec<(String, u64)> = self
            .scores
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries.truncate(n);

        entries
            .into_iter()
            .map(|(actor, score)| LeaderboardRow {
                nickname: self
                    .nicknames
                    .get(&actor)
                    .map(|e| e.value().clone())
                    .unwrap_or_else(|| UNKNOWN_NICKNAME.to_string()),
                score,
            })
            .collect()
    }

    /// A nickname is available while no actor currently holds it. Blank
    /// nicknames are never available.
    pub fn is_nickname_available(&self, nickname: &str) -> bool {
        let nickname = nickname.trim();
        if nickname.is_empty() {
            return false;
        }
        !self.nicknames.iter().any(|e| e.value().as_str() == nickname)
    }
}

impl Default for Leaderboard {
    fn default() -> Self {
        Self::new()
    }
}
