//! One-time voter code redemption
//!
//! A claim is a single conditional update at the store (`used = false` to
//! `used = true`), so concurrent claims of the same code resolve to exactly
//! one winner without any client-side locking.

use std::sync::Arc;

use chrono::Utc;

use crate::integrity::code_prefix;
use crate::integrity::session::VoterSession;
use crate::store::CodeStore;
use crate::types::{ConfirmedCode, VoterCode, normalize_code};
use crate::{Error, Result};

/// Code ledger service
pub struct CodeLedger<S> {
    store: Arc<S>,
}

impl<S: CodeStore> CodeLedger<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Claim a voter code exactly once
    ///
    /// The input is trimmed and uppercased first. An unknown code and an
    /// already used code both fail with [`Error::CodeRejected`].
    pub async fn claim(&self, raw_code: &str) -> Result<ConfirmedCode> {
        let code = normalize_code(raw_code).ok_or_else(|| Error::invalid_input("voter code"))?;
        let now = Utc::now();

        match self.store.claim_unused(&code, now).await {
            Ok(Some(row)) => {
                tracing::info!("✅ Voter code claimed: code={}", code_prefix(&row.code));
                Ok(ConfirmedCode {
                    claimed_at: row.used_at.unwrap_or(now),
                    code: row.code,
                })
            }
            Ok(None) => {
                tracing::warn!("🚫 Voter code rejected: code={}", code_prefix(&code));
                Err(Error::CodeRejected)
            }
            Err(e) => {
                tracing::error!("❌ Voter code claim failed: {}", e);
                Err(e)
            }
        }
    }

    /// Claim a code and open a voter session for it
    pub async fn open_session(&self, raw_code: &str) -> Result<VoterSession> {
        self.claim(raw_code).await.map(VoterSession::from)
    }

    /// Whether the code has already been claimed
    ///
    /// Lets a client that kept a confirmed code resume without claiming again.
    pub async fn is_claimed(&self, raw_code: &str) -> Result<bool> {
        match normalize_code(raw_code) {
            Some(code) => self.store.is_claimed(&code).await,
            None => Ok(false),
        }
    }

    /// Load codes at election setup. Blank and duplicate codes are skipped.
    pub async fn issue<'a>(&self, codes: impl IntoIterator<Item = &'a str>) -> Result<usize> {
        let rows: Vec<VoterCode> = codes.into_iter().filter_map(VoterCode::unused).collect();
        let inserted = self.store.insert_codes(rows).await?;
        tracing::info!("Issued {} voter codes", inserted);
        Ok(inserted)
    }
}
