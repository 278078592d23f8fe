//! Read-only tally aggregation and live refresh
//!
//! The engine never mutates votes except through the admin-only
//! [`TallyEngine::reset_position`]. Live results come from [`TallyWatcher`],
//! which re-reads the store on a fixed interval, so a committed vote shows
//! up within one polling interval.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::TallyConfig;
use crate::integrity::session::AdminSession;
use crate::store::{BallotStore, CandidateStore};
use crate::types::Position;
use crate::{Error, Result};

/// What a group of votes is counted under
///
/// Votes whose candidate was deleted (or moved to another position) all land
/// in the single `Unknown` bucket. `Unknown` sorts after every candidate.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum TallyKey {
    Candidate(String),
    Unknown,
}

/// Number of vote rows under one key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCount {
    pub key: TallyKey,
    pub count: u64,
}

/// One display row of a position report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyRow {
    pub key: TallyKey,
    /// Candidate name, `None` for the unknown bucket
    pub name: Option<String>,
    pub count: u64,
    /// Share of the position total, rounded to whole percent
    pub percentage: u32,
}

/// Results for one position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionTally {
    pub position: Position,
    pub total: u64,
    pub rows: Vec<TallyRow>,
}

/// Results for the whole election at one point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallySnapshot {
    pub positions: Vec<PositionTally>,
    /// Vote rows across all positions. One voter contributes up to three
    /// rows, so this is not a voter count.
    pub total_votes: u64,
    pub taken_at: DateTime<Utc>,
}

impl TallySnapshot {
    pub fn position(&self, position: Position) -> Option<&PositionTally> {
        self.positions.iter().find(|p| p.position == position)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Tally engine over the ballot store and candidate registry
pub struct TallyEngine<S> {
    store: Arc<S>,
}

impl<S> TallyEngine<S>
where
    S: BallotStore + CandidateStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Vote counts for `position`, highest first, ties broken by key
    ///
    /// Only keys with at least one vote appear. The counts always sum to the
    /// number of vote rows for the position.
    pub async fn counts_by_position(&self, position: Position) -> Result<Vec<VoteCount>> {
        let candidates = self.store.list_for_position(position).await?;
        let known: HashSet<&str> = candidates.iter().map(|c| c.id.as_str()).collect();
        let counts = self.raw_counts(position, &known).await?;
        Ok(sort_counts(counts))
    }

    /// Display report for `position`
    ///
    /// Unlike [`counts_by_position`](Self::counts_by_position) every
    /// registered candidate gets a row, with zero when nobody voted for them.
    pub async fn position_report(&self, position: Position) -> Result<PositionTally> {
        let candidates = self.store.list_for_position(position).await?;
        let known: HashSet<&str> = candidates.iter().map(|c| c.id.as_str()).collect();
        let mut counts = self.raw_counts(position, &known).await?;

        for candidate in &candidates {
            counts
                .entry(TallyKey::Candidate(candidate.id.clone()))
                .or_insert(0);
        }

        let total: u64 = counts.values().sum();
        let names: HashMap<&str, &str> = candidates
            .iter()
            .map(|c| (c.id.as_str(), c.name.as_str()))
            .collect();

        let rows = sort_counts(counts)
            .into_iter()
            .map(|VoteCount { key, count }| {
                let name = match &key {
                    TallyKey::Candidate(id) => names.get(id.as_str()).map(|n| n.to_string()),
                    TallyKey::Unknown => None,
                };
                TallyRow {
                    name,
                    count,
                    percentage: percentage(count, total),
                    key,
                }
            })
            .collect();

        Ok(PositionTally {
            position,
            total,
            rows,
        })
    }

    /// Vote rows across all positions
    pub async fn total_votes(&self) -> Result<u64> {
        self.store.count_all().await
    }

    /// Reports for every position plus the global total
    pub async fn snapshot(&self) -> Result<TallySnapshot> {
        let mut positions = Vec::with_capacity(Position::ALL.len());
        for position in Position::ALL {
            positions.push(self.position_report(position).await?);
        }

        Ok(TallySnapshot {
            positions,
            total_votes: self.total_votes().await?,
            taken_at: Utc::now(),
        })
    }

    /// Delete every vote for `position`. Irreversible.
    ///
    /// Claimed voter codes stay claimed; only the votes go.
    pub async fn reset_position(&self, admin: &AdminSession, position: Position) -> Result<u64> {
        let removed = self.store.delete_position(position).await?;
        tracing::warn!(
            "🧹 Votes reset: position={}, removed={}, by={}",
            position,
            removed,
            admin.username()
        );
        Ok(removed)
    }

    async fn raw_counts(
        &self,
        position: Position,
        known: &HashSet<&str>,
    ) -> Result<HashMap<TallyKey, u64>> {
        let ids = self.store.candidate_ids_for_position(position).await?;
        let mut counts: HashMap<TallyKey, u64> = HashMap::new();
        for id in ids {
            let key = if known.contains(id.as_str()) {
                TallyKey::Candidate(id)
            } else {
                TallyKey::Unknown
            };
            *counts.entry(key).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

fn sort_counts(counts: HashMap<TallyKey, u64>) -> Vec<VoteCount> {
    let mut sorted: Vec<VoteCount> = counts
        .into_iter()
        .map(|(key, count)| VoteCount { key, count })
        .collect();
    sorted.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    sorted
}

fn percentage(count: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    ((count as f64 / total as f64) * 100.0).round() as u32
}

/// Handle to a background task that keeps a fresh [`TallySnapshot`]
pub struct TallyWatcher {
    snapshots: watch::Receiver<Option<TallySnapshot>>,
    stop_signal: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl TallyWatcher {
    /// Start polling `engine` every `config.poll_interval()`
    ///
    /// The first poll runs immediately. A failed poll is logged and the
    /// previous snapshot stays published.
    pub fn spawn<S>(engine: Arc<TallyEngine<S>>, config: &TallyConfig) -> Result<Self>
    where
        S: BallotStore + CandidateStore + 'static,
    {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::internal(format!("tally watcher needs a Tokio runtime: {e}")))?;
        let period = config.poll_interval();
        let (snapshot_tx, snapshots) = watch::channel(None);
        let (stop_signal, mut stop_rx) = mpsc::channel::<()>(1);

        let task = runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            tracing::info!("📊 Tally watcher started (poll interval: {:?})", period);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        match engine.snapshot().await {
                            Ok(snapshot) => {
                                snapshot_tx.send_replace(Some(snapshot));
                            }
                            Err(e) => tracing::error!("❌ Tally poll failed: {}", e),
                        }
                    }
                    _ = stop_rx.recv() => {
                        tracing::info!("🛑 Tally watcher stopping");
                        break;
                    }
                }
            }
        });

        Ok(Self {
            snapshots,
            stop_signal,
            task,
        })
    }

    /// Receiver notified on every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<Option<TallySnapshot>> {
        self.snapshots.clone()
    }

    /// Most recent snapshot, `None` until the first poll succeeds
    pub fn latest(&self) -> Option<TallySnapshot> {
        self.snapshots.borrow().clone()
    }

    /// Stop polling and wait for the task to finish
    pub async fn stop(self) -> Result<()> {
        // The task may already be gone; joining below reports that
        let _ = self.stop_signal.send(()).await;
        self.task
            .await
            .map_err(|e| Error::internal(format!("tally watcher task failed: {e}")))
    }
}
