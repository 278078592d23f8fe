//! # Core Types for the Voting Core
//!
//! This module defines the records shared by the code ledger, the ballot
//! store, the candidate registry and the tally engine.
//!
//! ## Identity Model
//!
//! - A voter has no record of their own: the claimed voter code *is* the
//!   voter identity, always in normalized form (trimmed, uppercase).
//! - [`Position`] is a closed set of three offices.
//! - A [`Vote`] is unique per `(voter_code, position)`.
//!
//! ## Usage Examples
//!
//! ```rust
//! use vote_integrity::types::*;
//!
//! let position: Position = "ketua".parse().unwrap();
//! assert_eq!(position, Position::Ketua);
//!
//! assert_eq!(normalize_code("  ppgt-001 ").as_deref(), Some("PPGT-001"));
//! assert_eq!(normalize_code("   "), None);
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;

/// Normalize a raw voter code: trim surrounding whitespace and uppercase.
///
/// Returns `None` when nothing is left after trimming. Matching codes is
/// always done on normalized values, never with pattern matching, so a code
/// containing `%` or `_` only ever matches itself.
pub fn normalize_code(raw: &str) -> Option<String> {
    let code = raw.trim().to_uppercase();
    if code.is_empty() { None } else { Some(code) }
}

/// An electable office
///
/// The set is fixed for the election and cannot be extended at runtime.
///
/// # Examples
///
/// ```rust
/// use vote_integrity::types::Position;
///
/// assert_eq!(Position::ALL.len(), 3);
/// assert_eq!(Position::Sekretaris.to_string(), "Sekretaris");
/// assert_eq!("BENDAHARA".parse::<Position>().unwrap(), Position::Bendahara);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Position {
    Ketua,
    Sekretaris,
    Bendahara,
}

impl Position {
    /// All positions in ballot order
    pub const ALL: [Position; 3] = [Position::Ketua, Position::Sekretaris, Position::Bendahara];

    /// Display name, identical to the stored value
    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Ketua => "Ketua",
            Position::Sekretaris => "Sekretaris",
            Position::Bendahara => "Bendahara",
        }
    }

    /// Prefix used for generated candidate ids
    pub fn id_prefix(&self) -> char {
        match self {
            Position::Ketua => 'k',
            Position::Sekretaris => 's',
            Position::Bendahara => 'b',
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Position {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Position::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::invalid_input(format!("position '{wanted}'")))
    }
}

/// A single-use voter code as stored in the code ledger
///
/// Created in bulk before the election. `used` flips from `false` to `true`
/// exactly once, by a successful claim, and is never reverted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterCode {
    /// Normalized code string, unique
    pub code: String,

    /// Whether the code has been claimed
    pub used: bool,

    /// When the code was claimed
    pub used_at: Option<DateTime<Utc>>,
}

impl VoterCode {
    /// Create an unused code. Returns `None` for blank input.
    pub fn unused(raw: &str) -> Option<Self> {
        normalize_code(raw).map(|code| Self {
            code,
            used: false,
            used_at: None,
        })
    }
}

/// Proof of a successful claim, handed to the caller to keep for the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedCode {
    /// Normalized voter code; this is the voter identity from now on
    pub code: String,

    /// When the claim was committed
    pub claimed_at: DateTime<Utc>,
}

/// Candidate information for one position
///
/// Candidates are managed by an admin and may be deleted even after votes
/// were cast for them; the tally then reports those votes as unknown.
///
/// # Examples
///
/// ```rust
/// use vote_integrity::types::{Candidate, Position};
///
/// let candidate = Candidate::new("Sarah Panggua", Position::Ketua);
/// assert!(candidate.id.starts_with("k-"));
/// assert!(candidate.mission.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Unique candidate identifier
    pub id: String,

    /// Display name
    pub name: String,

    /// Office the candidate runs for
    pub position: Position,

    /// Portrait URL, empty when not set
    #[serde(default)]
    pub photo_url: String,

    /// Vision statement
    #[serde(default)]
    pub vision: String,

    /// Mission points, in display order
    #[serde(default)]
    pub mission: Vec<String>,
}

impl Candidate {
    /// Create a candidate with a freshly generated id and empty profile
    pub fn new(name: impl Into<String>, position: Position) -> Self {
        Self {
            id: format!("{}-{}", position.id_prefix(), Uuid::new_v4().simple()),
            name: name.into(),
            position,
            photo_url: String::new(),
            vision: String::new(),
            mission: Vec::new(),
        }
    }
}

/// One recorded vote
///
/// At most one row exists per `(voter_code, position)`. Rows are only ever
/// removed by resetting a whole position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub voter_code: String,
    pub position: Position,
    pub candidate_id: String,
    pub created_at: DateTime<Utc>,
}

impl Vote {
    /// Create a vote stamped with the current time
    pub fn new(voter_code: impl Into<String>, position: Position, candidate_id: impl Into<String>) -> Self {
        Self {
            voter_code: voter_code.into(),
            position,
            candidate_id: candidate_id.into(),
            created_at: Utc::now(),
        }
    }
}

/// Acknowledgement that a vote was durably recorded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub voter_code: String,
    pub position: Position,
    pub candidate_id: String,
    pub recorded_at: DateTime<Utc>,
}

impl From<Vote> for Ack {
    fn from(vote: Vote) -> Self {
        Self {
            voter_code: vote.voter_code,
            position: vote.position,
            candidate_id: vote.candidate_id,
            recorded_at: vote.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("ppgt-001").as_deref(), Some("PPGT-001"));
        assert_eq!(normalize_code("\t PpGt-002 \n").as_deref(), Some("PPGT-002"));
        assert_eq!(normalize_code(""), None);
        assert_eq!(normalize_code("   "), None);
    }

    #[test]
    fn test_position_parsing() {
        assert_eq!("Ketua".parse::<Position>().unwrap(), Position::Ketua);
        assert_eq!(" sekretaris ".parse::<Position>().unwrap(), Position::Sekretaris);
        assert!("Wakil".parse::<Position>().is_err());
    }

    #[test]
    fn test_position_serde_uses_names() {
        let json = serde_json::to_string(&Position::Bendahara).unwrap();
        assert_eq!(json, "\"Bendahara\"");

        let back: Position = serde_json::from_str("\"Ketua\"").unwrap();
        assert_eq!(back, Position::Ketua);
    }

    #[test]
    fn test_candidate_ids_are_unique_and_prefixed() {
        let a = Candidate::new("A", Position::Bendahara);
        let b = Candidate::new("B", Position::Bendahara);

        assert!(a.id.starts_with("b-"));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_candidate_deserializes_with_missing_profile() {
        let json = r#"{"id":"k1","name":"Daniel","position":"Ketua"}"#;
        let candidate: Candidate = serde_json::from_str(json).unwrap();

        assert_eq!(candidate.position, Position::Ketua);
        assert_eq!(candidate.photo_url, "");
        assert!(candidate.mission.is_empty());
    }

    #[test]
    fn test_voter_code_unused() {
        let code = VoterCode::unused(" abc ").unwrap();
        assert_eq!(code.code, "ABC");
        assert!(!code.used);
        assert!(code.used_at.is_none());

        assert!(VoterCode::unused("").is_none());
    }
}
