//! # Core Types for the Election Workflow
//!
//! This module defines the data model shared by the election engine, its
//! event log and the concurrent service wrapper.
//!
//! ## Type Categories
//!
//! ### Identity
//! - [`Principal`]: opaque, pre-authenticated caller identifier
//!
//! ### Workflow
//! - [`WorkflowStatus`]: the strictly ordered election phases
//!
//! ### Entities
//! - [`Voter`]: registration and ballot state of one principal
//! - [`Proposal`]: a submitted option with its running vote count
//! - [`TallyResult`] and [`ProposalResult`]: computed outcome
//!
//! ## Usage Examples
//!
//! ```rust
//! use election::types::{Principal, WorkflowStatus};
//!
//! let admin: Principal = "0x00000000000000000000000000000000000000aa".parse().unwrap();
//! assert_eq!(admin, Principal::from_bytes({
//!     let mut bytes = [0u8; 20];
//!     bytes[19] = 0xaa;
//!     bytes
//! }));
//!
//! let phase = WorkflowStatus::RegisteringVoters;
//! assert_eq!(phase.next(), Some(WorkflowStatus::ProposalsRegistrationStarted));
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Position of a proposal in submission order
pub type ProposalId = usize;

/// Length in bytes of the address behind a [`Principal`]
pub const PRINCIPAL_BYTES: usize = 20;

/// An opaque caller identifier
///
/// Principals are address-like tokens supplied by whatever layer
/// authenticates callers. The engine only ever compares them for equality;
/// no signature or key material is involved.
///
/// The textual form is a `0x`-prefixed, lowercase hex encoding of 20 bytes.
/// Parsing accepts either case and normalizes, so two spellings of the same
/// address compare equal.
///
/// # Examples
///
/// ```rust
/// use election::types::Principal;
///
/// let upper: Principal = "0xABCDEF0000000000000000000000000000000001".parse().unwrap();
/// let lower: Principal = "0xabcdef0000000000000000000000000000000001".parse().unwrap();
/// assert_eq!(upper, lower);
/// assert!("not-an-address".parse::<Principal>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Principal(String);

impl Principal {
    /// Build a principal from raw address bytes
    pub fn from_bytes(bytes: [u8; PRINCIPAL_BYTES]) -> Self {
        Self(format!("0x{}", hex::encode(bytes)))
    }

    /// Generate a random principal, mostly useful for fixtures
    pub fn random() -> Self {
        Self::from_bytes(rand::random::<[u8; PRINCIPAL_BYTES]>())
    }

    /// Normalized textual form
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for log lines
    pub fn short(&self) -> &str {
        &self.0[..10]
    }
}

impl FromStr for Principal {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| crate::validation_error!("principal must start with 0x: {}", s))?;

        let bytes = hex::decode(digits)
            .map_err(|_| crate::validation_error!("principal must be hex encoded: {}", s))?;

        let bytes: [u8; PRINCIPAL_BYTES] = bytes.try_into().map_err(|_| {
            crate::validation_error!("principal must be {} bytes: {}", PRINCIPAL_BYTES, s)
        })?;

        Ok(Self::from_bytes(bytes))
    }
}

impl TryFrom<String> for Principal {
    type Error = crate::Error;

    fn try_from(value: String) -> crate::Result<Self> {
        value.parse()
    }
}

impl From<Principal> for String {
    fn from(principal: Principal) -> Self {
        principal.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Election phase
///
/// Phases progress strictly forward, one step at a time:
///
/// ```text
/// RegisteringVoters -> ProposalsRegistrationStarted -> ProposalsRegistrationEnded
///   -> VotingSessionStarted -> VotingSessionEnded -> VotesTallied
/// ```
///
/// The declaration order is the progression order, so `Ord` compares phases
/// by how far along the election is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WorkflowStatus {
    RegisteringVoters,
    ProposalsRegistrationStarted,
    ProposalsRegistrationEnded,
    VotingSessionStarted,
    VotingSessionEnded,
    VotesTallied,
}

impl WorkflowStatus {
    /// All phases in progression order
    pub const ALL: [WorkflowStatus; 6] = [
        WorkflowStatus::RegisteringVoters,
        WorkflowStatus::ProposalsRegistrationStarted,
        WorkflowStatus::ProposalsRegistrationEnded,
        WorkflowStatus::VotingSessionStarted,
        WorkflowStatus::VotingSessionEnded,
        WorkflowStatus::VotesTallied,
    ];

    /// The phase that follows this one, `None` once votes are tallied
    pub fn next(self) -> Option<WorkflowStatus> {
        match self {
            WorkflowStatus::RegisteringVoters => Some(WorkflowStatus::ProposalsRegistrationStarted),
            WorkflowStatus::ProposalsRegistrationStarted => {
                Some(WorkflowStatus::ProposalsRegistrationEnded)
            }
            WorkflowStatus::ProposalsRegistrationEnded => Some(WorkflowStatus::VotingSessionStarted),
            WorkflowStatus::VotingSessionStarted => Some(WorkflowStatus::VotingSessionEnded),
            WorkflowStatus::VotingSessionEnded => Some(WorkflowStatus::VotesTallied),
            WorkflowStatus::VotesTallied => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == WorkflowStatus::VotesTallied
    }

    /// Ordinal of the phase, 0 for `RegisteringVoters` through 5 for `VotesTallied`
    pub fn index(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Registration and ballot state of a single principal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    pub principal: Principal,
    pub is_registered: bool,
    pub has_voted: bool,
    /// Proposal the voter chose, set together with `has_voted`
    pub voted_proposal_id: Option<ProposalId>,
}

impl Voter {
    /// A freshly registered voter that has not voted yet
    pub fn registered(principal: Principal) -> Self {
        Self {
            principal,
            is_registered: true,
            has_voted: false,
            voted_proposal_id: None,
        }
    }
}

/// A submitted proposal
///
/// Everything but `vote_count` is fixed at submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Dense, zero-based submission index
    pub id: ProposalId,
    pub description: String,
    pub vote_count: u64,
    /// Registered voter that submitted the proposal
    pub submitted_by: Principal,
}

/// Outcome of a tally
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyResult {
    /// Lowest-indexed proposal among those with the maximum vote count
    pub winning_proposal_id: ProposalId,
    pub winning_vote_count: u64,
    pub total_votes: u64,
    pub tallied_at: DateTime<Utc>,
}

/// One row of the results table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalResult {
    pub proposal_id: ProposalId,
    pub description: String,
    pub vote_count: u64,
    /// Share of all cast votes, `0.0` when nobody voted
    pub percentage: f64,
    pub is_winner: bool,
}
