//! Candidate registry
//!
//! Plain CRUD over the candidates table. Mutations require an
//! [`AdminSession`]. Nothing here looks at votes: deleting a candidate leaves
//! its votes in place and the tally reports them as unknown.

use std::sync::Arc;

use crate::integrity::session::AdminSession;
use crate::store::CandidateStore;
use crate::types::{Candidate, Position};
use crate::{Error, Result};

pub struct CandidateRegistry<S> {
    store: Arc<S>,
}

impl<S: CandidateStore> CandidateRegistry<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// All candidates ordered by position, then name
    pub async fn list(&self) -> Result<Vec<Candidate>> {
        self.store.list().await
    }

    pub async fn list_for_position(&self, position: Position) -> Result<Vec<Candidate>> {
        self.store.list_for_position(position).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<Candidate>> {
        self.store.get(id).await
    }

    /// Insert or replace a candidate by id
    pub async fn upsert(&self, admin: &AdminSession, mut candidate: Candidate) -> Result<Candidate> {
        candidate.id = candidate.id.trim().to_string();
        candidate.name = candidate.name.trim().to_string();
        if candidate.id.is_empty() {
            return Err(Error::invalid_input("candidate id"));
        }
        if candidate.name.is_empty() {
            return Err(Error::invalid_input("candidate name"));
        }

        self.store.upsert(candidate.clone()).await?;
        tracing::info!(
            "Candidate saved: id={}, position={}, by={}",
            candidate.id,
            candidate.position,
            admin.username()
        );
        Ok(candidate)
    }

    /// Register a new candidate with a generated id and empty profile
    pub async fn add(&self, admin: &AdminSession, name: &str, position: Position) -> Result<Candidate> {
        self.upsert(admin, Candidate::new(name, position)).await
    }

    /// Change only the display name
    pub async fn rename(&self, admin: &AdminSession, id: &str, name: &str) -> Result<Candidate> {
        let candidate = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| Error::invalid_input(format!("candidate '{id}'")))?;
        self.upsert(
            admin,
            Candidate {
                name: name.to_string(),
                ..candidate
            },
        )
        .await
    }

    /// Remove a candidate. Unknown ids are not an error.
    pub async fn delete(&self, admin: &AdminSession, id: &str) -> Result<bool> {
        let removed = self.store.delete(id).await?;
        if removed {
            tracing::info!("Candidate deleted: id={}, by={}", id, admin.username());
        }
        Ok(removed)
    }
}
