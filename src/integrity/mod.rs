//! Vote integrity services
//!
//! 1. [`CodeLedger`]: exactly-once voter code claims
//! 2. [`VoteIntegrityService`]: one vote per voter per position
//! 3. [`TallyEngine`] / [`TallyWatcher`]: read-only results and live refresh
//! 4. [`CandidateRegistry`]: admin-managed candidate list
//! 5. [`session`]: explicit voter and admin session values

pub mod code_ledger;
pub mod registry;
pub mod session;
pub mod tally;
pub mod vote_service;

use std::sync::Arc;

use crate::Result;
use crate::config::Config;
use crate::store::{BallotStore, CandidateStore, CodeStore};

pub use code_ledger::CodeLedger;
pub use registry::CandidateRegistry;
pub use session::{AdminGate, AdminSession, VoterSession};
pub use tally::{PositionTally, TallyEngine, TallyKey, TallyRow, TallySnapshot, TallyWatcher, VoteCount};
pub use vote_service::VoteIntegrityService;

/// Number of leading characters of a voter code that may appear in logs
const LOGGED_CODE_CHARS: usize = 4;

/// Log-safe prefix of a voter code
pub(crate) fn code_prefix(code: &str) -> &str {
    match code.char_indices().nth(LOGGED_CODE_CHARS) {
        Some((idx, _)) => &code[..idx],
        None => code,
    }
}

/// All services wired to one shared backend
pub struct VotingContext<S> {
    pub ledger: CodeLedger<S>,
    pub votes: VoteIntegrityService<S>,
    pub tally: Arc<TallyEngine<S>>,
    pub registry: CandidateRegistry<S>,
    pub admin_gate: AdminGate,
    config: Config,
}

impl<S> VotingContext<S>
where
    S: CodeStore + BallotStore + CandidateStore + 'static,
{
    pub fn new(store: Arc<S>, config: Config) -> Self {
        Self {
            ledger: CodeLedger::new(store.clone()),
            votes: VoteIntegrityService::new(store.clone()),
            tally: Arc::new(TallyEngine::new(store.clone())),
            registry: CandidateRegistry::new(store),
            admin_gate: AdminGate::new(&config.admin),
            config,
        }
    }

    /// Start live tally polling with the configured interval
    pub fn watch_tally(&self) -> Result<TallyWatcher> {
        TallyWatcher::spawn(self.tally.clone(), &self.config.tally)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
