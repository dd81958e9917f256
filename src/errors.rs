//! Error handling for the election workflow
//!
//! Every rejected operation surfaces as one of these variants and leaves the
//! election untouched.

use crate::types::{Principal, ProposalId, WorkflowStatus};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type alias for the election workflow
pub type Result<T> = std::result::Result<T, Error>;

/// Role a caller must hold to invoke an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// The principal that created the election
    Administrator,
    /// Any principal registered during `RegisteringVoters`
    RegisteredVoter,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Administrator => write!(f, "administrator"),
            Role::RegisteredVoter => write!(f, "registered voter"),
        }
    }
}

/// Main error type for the election workflow
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Caller does not hold the role the operation requires
    #[error("Unauthorized: {principal} is not the {role}")]
    Unauthorized { principal: Principal, role: Role },

    /// Operation attempted outside the phase it is admissible in
    #[error("Invalid phase: {operation} is not allowed during {current}")]
    InvalidPhase {
        operation: &'static str,
        current: WorkflowStatus,
    },

    /// Phase transition invoked from the wrong source phase
    #[error("Invalid phase transition: {operation} requires {required}, current phase is {current}")]
    InvalidPhaseTransition {
        operation: &'static str,
        current: WorkflowStatus,
        required: WorkflowStatus,
    },

    #[error("Voter is already registered: {principal}")]
    AlreadyRegistered { principal: Principal },

    #[error("This proposal has already been submitted: {description:?}")]
    DuplicateProposal { description: String },

    #[error("Voter {principal} has already voted for proposal {proposal_id}")]
    AlreadyVoted {
        principal: Principal,
        proposal_id: ProposalId,
    },

    #[error("Invalid proposal ID: {proposal_id} (proposal count: {proposal_count})")]
    InvalidProposalId {
        proposal_id: ProposalId,
        proposal_count: usize,
    },

    #[error("Votes have not been tallied yet")]
    NotTalliedYet,

    #[error("Cannot tally an election without proposals")]
    NoProposals,

    #[error("Voter not found: {principal}")]
    VoterNotFound { principal: Principal },

    /// Malformed caller input
    #[error("Validation failed: {field}")]
    Validation { field: String },

    /// Configuration loading errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Fieldless discriminant of [`Error`] for branching without destructuring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnauthorizedAdministrator,
    UnauthorizedVoter,
    InvalidPhase,
    InvalidPhaseTransition,
    AlreadyRegistered,
    DuplicateProposal,
    AlreadyVoted,
    InvalidProposalId,
    NotTalliedYet,
    NoProposals,
    VoterNotFound,
    Validation,
    Configuration,
    Serialization,
    Internal,
}

impl Error {
    /// Create a new unauthorized error
    pub fn unauthorized(principal: &Principal, role: Role) -> Self {
        Self::Unauthorized {
            principal: principal.clone(),
            role,
        }
    }

    /// Create a new validation error
    pub fn validation(field: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
        }
    }

    /// Create a new configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a new internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Unauthorized {
                role: Role::Administrator,
                ..
            } => ErrorKind::UnauthorizedAdministrator,
            Error::Unauthorized {
                role: Role::RegisteredVoter,
                ..
            } => ErrorKind::UnauthorizedVoter,
            Error::InvalidPhase { .. } => ErrorKind::InvalidPhase,
            Error::InvalidPhaseTransition { .. } => ErrorKind::InvalidPhaseTransition,
            Error::AlreadyRegistered { .. } => ErrorKind::AlreadyRegistered,
            Error::DuplicateProposal { .. } => ErrorKind::DuplicateProposal,
            Error::AlreadyVoted { .. } => ErrorKind::AlreadyVoted,
            Error::InvalidProposalId { .. } => ErrorKind::InvalidProposalId,
            Error::NotTalliedYet => ErrorKind::NotTalliedYet,
            Error::NoProposals => ErrorKind::NoProposals,
            Error::VoterNotFound { .. } => ErrorKind::VoterNotFound,
            Error::Validation { .. } => ErrorKind::Validation,
            Error::Configuration { .. } => ErrorKind::Configuration,
            Error::Serialization(_) => ErrorKind::Serialization,
            Error::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Whether the error is an authorization failure of either role
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Unauthorized { .. })
    }
}

/// Convenience macros for creating specific error types
#[macro_export]
macro_rules! validation_error {
    ($msg:expr) => {
        $crate::Error::validation($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::validation(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! internal_error {
    ($msg:expr) => {
        $crate::Error::internal($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::internal(format!($fmt, $($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let principal = Principal::from_bytes([7u8; 20]);

        let admin_err = Error::unauthorized(&principal, Role::Administrator);
        assert_eq!(admin_err.kind(), ErrorKind::UnauthorizedAdministrator);
        assert!(admin_err.is_unauthorized());

        let voter_err = Error::unauthorized(&principal, Role::RegisteredVoter);
        assert_eq!(voter_err.kind(), ErrorKind::UnauthorizedVoter);
        assert_ne!(admin_err.kind(), voter_err.kind());

        let validation_err = Error::validation("description");
        assert!(matches!(validation_err, Error::Validation { .. }));
        assert!(!validation_err.is_unauthorized());
    }

    #[test]
    fn test_error_macros() {
        let validation_err = validation_error!("description longer than {} bytes", 256);
        match validation_err {
            Error::Validation { field } => assert!(field.contains("256")),
            other => panic!("Unexpected error: {other:?}"),
        }

        let internal_err = internal_error!("lock poisoned");
        assert_eq!(internal_err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_error_messages() {
        let err = Error::InvalidPhaseTransition {
            operation: "start_voting_session",
            current: WorkflowStatus::RegisteringVoters,
            required: WorkflowStatus::ProposalsRegistrationEnded,
        };
        let message = err.to_string();
        assert!(message.contains("start_voting_session"));
        assert!(message.contains("ProposalsRegistrationEnded"));

        let err = Error::InvalidProposalId {
            proposal_id: 4,
            proposal_count: 2,
        };
        assert!(err.to_string().contains("Invalid proposal ID: 4"));
    }
}
