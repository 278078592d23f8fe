//! Explicit session context for voters and admins
//!
//! Sessions are plain values handed to the services that need them rather
//! than process-wide flags. An [`AdminSession`] can only be obtained from
//! [`AdminGate::login`], so holding one is the capability to mutate
//! candidates and reset tallies.

use chrono::{DateTime, Utc};
use subtle::ConstantTimeEq;

use crate::config::AdminConfig;
use crate::integrity::code_prefix;
use crate::types::ConfirmedCode;
use crate::{Error, Result};

/// Static credential check for admin operations
pub struct AdminGate {
    username_digest: [u8; 32],
    password_digest: [u8; 32],
}

impl AdminGate {
    pub fn new(config: &AdminConfig) -> Self {
        Self {
            username_digest: blake3::hash(config.username.as_bytes()).into(),
            password_digest: blake3::hash(config.password.as_bytes()).into(),
        }
    }

    /// Check credentials and open an admin session
    ///
    /// Both fields are compared as fixed-size digests in constant time, and
    /// both comparisons always run.
    pub fn login(&self, username: &str, password: &str) -> Result<AdminSession> {
        let user: [u8; 32] = blake3::hash(username.as_bytes()).into();
        let pass: [u8; 32] = blake3::hash(password.as_bytes()).into();

        let matches = user.ct_eq(&self.username_digest) & pass.ct_eq(&self.password_digest);
        if !bool::from(matches) {
            tracing::warn!("Admin login rejected");
            return Err(Error::Unauthorized);
        }

        tracing::info!("Admin session opened for {}", username);
        Ok(AdminSession {
            username: username.to_string(),
            started_at: Utc::now(),
        })
    }
}

/// Proof of a successful admin login
#[derive(Debug, Clone)]
pub struct AdminSession {
    username: String,
    started_at: DateTime<Utc>,
}

impl AdminSession {
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

/// A voter identified by a claimed code
///
/// Ending the session is dropping the value; the code itself stays consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoterSession {
    code: String,
    claimed_at: DateTime<Utc>,
}

impl VoterSession {
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn claimed_at(&self) -> DateTime<Utc> {
        self.claimed_at
    }
}

impl From<ConfirmedCode> for VoterSession {
    fn from(confirmed: ConfirmedCode) -> Self {
        tracing::debug!("Voter session opened: code={}", code_prefix(&confirmed.code));
        Self {
            code: confirmed.code,
            claimed_at: confirmed.claimed_at,
        }
    }
}
