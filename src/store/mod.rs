//! Backend contract for the three tables the voting core relies on
//!
//! Every mutating method must be a single atomic statement at the store:
//! 1. `claim_unused` is a compare-and-set on `used`
//! 2. `insert_vote` is an insert rejected by the `(voter_code, position)`
//!    unique constraint, never an upsert
//! 3. `delete_position` removes every row of one position at once
//!
//! The services never read-then-write for these operations, so correctness
//! under concurrent clients rests entirely on the store honoring this.

pub mod memory;

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::Result;
use crate::types::{Candidate, Position, Vote, VoterCode};

pub use memory::MemoryBackend;

/// Outcome of an insert against the `(voter_code, position)` constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Row written
    Inserted(Vote),

    /// A row already existed and was left untouched
    Conflict(Vote),
}

/// The `voter_codes` table
pub trait CodeStore: Send + Sync {
    /// Atomically flip `used` to true on the row whose normalized code equals
    /// `code` and which is still unused. Returns the updated row, or `None`
    /// when the code is unknown or already used.
    fn claim_unused(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Option<VoterCode>>> + Send;

    /// Whether `code` exists and has been claimed
    fn is_claimed(&self, code: &str) -> impl Future<Output = Result<bool>> + Send;

    /// Bulk load codes; rows whose code already exists are skipped.
    /// Returns the number of rows inserted.
    fn insert_codes(&self, codes: Vec<VoterCode>) -> impl Future<Output = Result<usize>> + Send;
}

/// The `votes` table
pub trait BallotStore: Send + Sync {
    /// Insert-only write keyed by `(voter_code, position)`
    fn insert_vote(&self, vote: Vote) -> impl Future<Output = Result<InsertOutcome>> + Send;

    /// Positions with a recorded vote for `voter_code`
    fn positions_for_voter(
        &self,
        voter_code: &str,
    ) -> impl Future<Output = Result<Vec<Position>>> + Send;

    /// Candidate id of every vote row for `position`
    fn candidate_ids_for_position(
        &self,
        position: Position,
    ) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Number of vote rows across all positions
    fn count_all(&self) -> impl Future<Output = Result<u64>> + Send;

    /// Delete every vote row for `position`, returning how many were removed
    fn delete_position(&self, position: Position) -> impl Future<Output = Result<u64>> + Send;
}

/// The `candidates` table
pub trait CandidateStore: Send + Sync {
    /// All candidates ordered by position, then name
    fn list(&self) -> impl Future<Output = Result<Vec<Candidate>>> + Send;

    /// Candidates registered for one position, in [`list`](Self::list) order
    fn list_for_position(
        &self,
        position: Position,
    ) -> impl Future<Output = Result<Vec<Candidate>>> + Send {
        async move {
            let all = self.list().await?;
            Ok(all.into_iter().filter(|c| c.position == position).collect())
        }
    }

    fn get(&self, id: &str) -> impl Future<Output = Result<Option<Candidate>>> + Send;

    /// Insert or replace by id
    fn upsert(&self, candidate: Candidate) -> impl Future<Output = Result<()>> + Send;

    /// Returns whether a row was removed
    fn delete(&self, id: &str) -> impl Future<Output = Result<bool>> + Send;
}
