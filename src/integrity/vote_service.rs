//! One vote per voter per position
//!
//! The ballot store's `(voter_code, position)` constraint is the only real
//! guard. [`VoteIntegrityService::voted_positions`] exists to lock the UI and
//! never authorizes a write on its own.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::integrity::code_prefix;
use crate::integrity::session::VoterSession;
use crate::store::{BallotStore, CandidateStore, CodeStore, InsertOutcome};
use crate::types::{Ack, Position, Vote, normalize_code};
use crate::{Error, Result};

/// Vote integrity service
pub struct VoteIntegrityService<S> {
    store: Arc<S>,
}

impl<S> VoteIntegrityService<S>
where
    S: CodeStore + BallotStore + CandidateStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Record a vote exactly once
    ///
    /// Checks run in this order:
    /// 1. voter code present, else [`Error::MissingVoterCode`]
    /// 2. code claimed in the ledger, else [`Error::CodeRejected`]
    /// 3. candidate exists for `position`, else [`Error::InvalidCandidate`]
    /// 4. insert-only write, [`Error::DuplicateVote`] when a row exists
    ///
    /// Any store failure becomes [`Error::SubmissionFailed`] and leaves
    /// nothing recorded.
    pub async fn cast_vote(
        &self,
        voter_code: &str,
        position: Position,
        candidate_id: &str,
    ) -> Result<Ack> {
        let code = normalize_code(voter_code).ok_or(Error::MissingVoterCode)?;

        let claimed = self.store.is_claimed(&code).await.map_err(submission_failed)?;
        if !claimed {
            tracing::warn!("🚫 Vote from unclaimed code: code={}", code_prefix(&code));
            return Err(Error::CodeRejected);
        }

        let candidate = self.store.get(candidate_id).await.map_err(submission_failed)?;
        if !candidate.is_some_and(|c| c.position == position) {
            tracing::warn!(
                "🚫 Vote for invalid candidate: candidate={}, position={}",
                candidate_id,
                position
            );
            return Err(Error::InvalidCandidate {
                candidate_id: candidate_id.to_string(),
                position,
            });
        }

        let vote = Vote::new(code, position, candidate_id);
        match self.store.insert_vote(vote).await.map_err(submission_failed)? {
            InsertOutcome::Inserted(vote) => {
                tracing::info!(
                    "🗳️ Vote recorded: code={}, position={}",
                    code_prefix(&vote.voter_code),
                    vote.position
                );
                Ok(Ack::from(vote))
            }
            InsertOutcome::Conflict(existing) => {
                tracing::warn!(
                    "🔒 Duplicate vote rejected: code={}, position={}",
                    code_prefix(&existing.voter_code),
                    existing.position
                );
                Err(Error::DuplicateVote {
                    voter_code: existing.voter_code,
                    position: existing.position,
                })
            }
        }
    }

    /// [`cast_vote`](Self::cast_vote) for the voter of an open session
    pub async fn cast_for(
        &self,
        session: &VoterSession,
        position: Position,
        candidate_id: &str,
    ) -> Result<Ack> {
        self.cast_vote(session.code(), position, candidate_id).await
    }

    /// Positions the voter has already voted for
    pub async fn voted_positions(&self, voter_code: &str) -> Result<BTreeSet<Position>> {
        let Some(code) = normalize_code(voter_code) else {
            return Ok(BTreeSet::new());
        };
        let positions = self.store.positions_for_voter(&code).await?;
        Ok(positions.into_iter().collect())
    }

    /// Positions still open to the voter, in ballot order
    pub async fn remaining_positions(&self, voter_code: &str) -> Result<Vec<Position>> {
        let voted = self.voted_positions(voter_code).await?;
        Ok(Position::ALL
            .into_iter()
            .filter(|p| !voted.contains(p))
            .collect())
    }
}

fn submission_failed(err: Error) -> Error {
    tracing::error!("❌ Vote submission failed: {}", err);
    match err {
        Error::Backend { message } => Error::submission_failed(message),
        other => Error::submission_failed(other.to_string()),
    }
}
