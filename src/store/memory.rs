//! In-process backend implementing all three tables
//!
//! Each operation holds a single guard for its whole read-modify-write, which
//! gives the same atomicity a relational store provides for one conditional
//! statement.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::store::{BallotStore, CandidateStore, CodeStore, InsertOutcome};
use crate::types::{Candidate, Position, Vote, VoterCode, normalize_code};
use crate::{Result, store_error};

/// Shared in-memory store
#[derive(Default)]
pub struct MemoryBackend {
    /// normalized code -> row
    codes: RwLock<HashMap<String, VoterCode>>,
    /// (voter_code, position) -> row; the key is the unique constraint
    votes: RwLock<BTreeMap<(String, Position), Vote>>,
    /// candidate id -> row
    candidates: RwLock<HashMap<String, Candidate>>,
    offline: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend preloaded with unused codes and candidates
    pub async fn seeded<'a>(
        codes: impl IntoIterator<Item = &'a str>,
        candidates: impl IntoIterator<Item = Candidate>,
    ) -> Result<Self> {
        let backend = Self::new();
        let rows = codes.into_iter().filter_map(VoterCode::unused).collect();
        backend.insert_codes(rows).await?;
        for candidate in candidates {
            backend.upsert(candidate).await?;
        }
        Ok(backend)
    }

    /// Make every subsequent call fail as if the store were unreachable
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
        tracing::warn!("Memory backend offline={}", offline);
    }

    fn ensure_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(store_error!("backend unavailable"));
        }
        Ok(())
    }
}

impl CodeStore for MemoryBackend {
    async fn claim_unused(&self, code: &str, now: DateTime<Utc>) -> Result<Option<VoterCode>> {
        self.ensure_online()?;
        let Some(key) = normalize_code(code) else {
            return Ok(None);
        };

        let mut codes = self.codes.write().await;
        match codes.get_mut(&key) {
            Some(row) if !row.used => {
                row.used = true;
                row.used_at = Some(now);
                Ok(Some(row.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn is_claimed(&self, code: &str) -> Result<bool> {
        self.ensure_online()?;
        let Some(key) = normalize_code(code) else {
            return Ok(false);
        };

        let codes = self.codes.read().await;
        Ok(codes.get(&key).is_some_and(|row| row.used))
    }

    async fn insert_codes(&self, rows: Vec<VoterCode>) -> Result<usize> {
        self.ensure_online()?;
        let mut codes = self.codes.write().await;
        let mut inserted = 0;

        for row in rows {
            let Some(key) = normalize_code(&row.code) else {
                continue;
            };
            if codes.contains_key(&key) {
                continue;
            }
            codes.insert(key.clone(), VoterCode { code: key, ..row });
            inserted += 1;
        }

        Ok(inserted)
    }
}

impl BallotStore for MemoryBackend {
    async fn insert_vote(&self, vote: Vote) -> Result<InsertOutcome> {
        self.ensure_online()?;
        let key = (vote.voter_code.clone(), vote.position);

        let mut votes = self.votes.write().await;
        if let Some(existing) = votes.get(&key) {
            return Ok(InsertOutcome::Conflict(existing.clone()));
        }
        votes.insert(key, vote.clone());
        Ok(InsertOutcome::Inserted(vote))
    }

    async fn positions_for_voter(&self, voter_code: &str) -> Result<Vec<Position>> {
        self.ensure_online()?;
        let votes = self.votes.read().await;
        Ok(Position::ALL
            .into_iter()
            .filter(|p| votes.contains_key(&(voter_code.to_string(), *p)))
            .collect())
    }

    async fn candidate_ids_for_position(&self, position: Position) -> Result<Vec<String>> {
        self.ensure_online()?;
        let votes = self.votes.read().await;
        Ok(votes
            .values()
            .filter(|v| v.position == position)
            .map(|v| v.candidate_id.clone())
            .collect())
    }

    async fn count_all(&self) -> Result<u64> {
        self.ensure_online()?;
        Ok(self.votes.read().await.len() as u64)
    }

    async fn delete_position(&self, position: Position) -> Result<u64> {
        self.ensure_online()?;
        let mut votes = self.votes.write().await;
        let before = votes.len();
        votes.retain(|(_, p), _| *p != position);
        Ok((before - votes.len()) as u64)
    }
}

impl CandidateStore for MemoryBackend {
    async fn list(&self) -> Result<Vec<Candidate>> {
        self.ensure_online()?;
        let candidates = self.candidates.read().await;
        let mut list: Vec<Candidate> = candidates.values().cloned().collect();
        list.sort_by(|a, b| {
            a.position
                .cmp(&b.position)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(list)
    }

    async fn get(&self, id: &str) -> Result<Option<Candidate>> {
        self.ensure_online()?;
        Ok(self.candidates.read().await.get(id).cloned())
    }

    async fn upsert(&self, candidate: Candidate) -> Result<()> {
        self.ensure_online()?;
        self.candidates
            .write()
            .await
            .insert(candidate.id.clone(), candidate);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        self.ensure_online()?;
        Ok(self.candidates.write().await.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_claim_unused_is_compare_and_set() {
        let backend = MemoryBackend::seeded(["PPGT-001"], []).await.unwrap();

        let first = backend.claim_unused("ppgt-001", Utc::now()).await.unwrap();
        let row = first.expect("first claim should match");
        assert!(row.used);
        assert!(row.used_at.is_some());

        let second = backend.claim_unused("PPGT-001", Utc::now()).await.unwrap();
        assert!(second.is_none());
        assert!(backend.is_claimed("PPGT-001").await.unwrap());
    }

    #[tokio::test]
    async fn test_claim_uses_equality_not_patterns() {
        let backend = MemoryBackend::seeded(["PPGT-001"], []).await.unwrap();

        // Wildcards from a LIKE-style matcher must not match anything
        assert!(backend.claim_unused("PPGT-%", Utc::now()).await.unwrap().is_none());
        assert!(backend.claim_unused("PPGT_001", Utc::now()).await.unwrap().is_none());
        assert!(!backend.is_claimed("PPGT-001").await.unwrap());
    }

    #[tokio::test]
    async fn test_insert_codes_skips_duplicates() {
        let backend = MemoryBackend::new();
        let rows = ["a1", "A1", " b2 "]
            .into_iter()
            .filter_map(VoterCode::unused)
            .collect();

        assert_eq!(backend.insert_codes(rows).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_insert_vote_never_overwrites() {
        let backend = MemoryBackend::new();

        let first = backend
            .insert_vote(Vote::new("V1", Position::Ketua, "k1"))
            .await
            .unwrap();
        assert!(matches!(first, InsertOutcome::Inserted(_)));

        let second = backend
            .insert_vote(Vote::new("V1", Position::Ketua, "k2"))
            .await
            .unwrap();
        match second {
            InsertOutcome::Conflict(existing) => assert_eq!(existing.candidate_id, "k1"),
            other => panic!("expected conflict, got {other:?}"),
        }

        let ids = backend.candidate_ids_for_position(Position::Ketua).await.unwrap();
        assert_eq!(ids, vec!["k1".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_position_only_touches_that_position() {
        let backend = MemoryBackend::new();
        backend.insert_vote(Vote::new("V1", Position::Ketua, "k1")).await.unwrap();
        backend.insert_vote(Vote::new("V2", Position::Ketua, "k1")).await.unwrap();
        backend.insert_vote(Vote::new("V1", Position::Bendahara, "b1")).await.unwrap();

        assert_eq!(backend.delete_position(Position::Ketua).await.unwrap(), 2);
        assert_eq!(backend.count_all().await.unwrap(), 1);
        assert_eq!(
            backend.positions_for_voter("V1").await.unwrap(),
            vec![Position::Bendahara]
        );
    }

    #[tokio::test]
    async fn test_candidates_listed_by_position_then_name() {
        let backend = MemoryBackend::new();
        let mut zed = Candidate::new("Zed", Position::Ketua);
        zed.id = "k2".to_string();
        let mut amy = Candidate::new("Amy", Position::Ketua);
        amy.id = "k1".to_string();
        let mut bob = Candidate::new("Bob", Position::Bendahara);
        bob.id = "b1".to_string();

        for c in [bob, zed, amy] {
            backend.upsert(c).await.unwrap();
        }

        let ids: Vec<String> = backend.list().await.unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["k1", "k2", "b1"]);
    }

    #[tokio::test]
    async fn test_list_for_position_filters_and_keeps_order() {
        let backend = MemoryBackend::new();
        let mut sarah = Candidate::new("Sarah", Position::Ketua);
        sarah.id = "k2".to_string();
        let mut daniel = Candidate::new("Daniel", Position::Ketua);
        daniel.id = "k1".to_string();
        let mut rini = Candidate::new("Rini", Position::Bendahara);
        rini.id = "b1".to_string();

        for c in [sarah, rini, daniel] {
            backend.upsert(c).await.unwrap();
        }

        let ketua: Vec<String> = backend
            .list_for_position(Position::Ketua)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ketua, vec!["k1", "k2"]);
        assert!(backend.list_for_position(Position::Sekretaris).await.unwrap().is_empty());

        backend.set_offline(true);
        assert!(backend.list_for_position(Position::Ketua).await.is_err());
    }

    #[tokio::test]
    async fn test_offline_backend_fails_every_call() {
        let backend = MemoryBackend::new();
        backend.set_offline(true);

        assert!(backend.count_all().await.is_err());
        assert!(backend.list().await.is_err());
        assert!(backend.claim_unused("X", Utc::now()).await.is_err());

        backend.set_offline(false);
        assert_eq!(backend.count_all().await.unwrap(), 0);
    }
}
