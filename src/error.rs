//! Domain errors that callers are expected to match on.
//!
//! Plumbing (storage, settings, the CLI) stays on `anyhow::Result`; these
//! enums cover the cases a front end must tell apart.

use thiserror::Error;

use crate::timer::BrewStage;

/// Rejected brew plans and illegal stage transitions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BrewError {
    #[error("brew plan needs at least one steep")]
    NoSteeps,

    #[error("steep duration table is empty")]
    EmptyDurationTable,

    #[error("steep {steep} has a zero-second duration")]
    ZeroDuration { steep: u32 },

    #[error("heating time must be greater than zero")]
    ZeroHeating,

    #[error("cannot {action} while {stage}")]
    InvalidTransition {
        action: &'static str,
        stage: BrewStage,
    },

    #[error("steep {current} of {total} is the last one")]
    NoMoreSteeps { current: u32, total: u32 },

    #[error("steep {current} of {total} has not been reached yet")]
    StepsRemaining { current: u32, total: u32 },

    #[error("nothing to pause")]
    NotCounting,

    #[error("brew is not paused")]
    NotPaused,
}

/// Validation failures when creating a session. Nothing is stored when one
/// of these is returned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("total steeps must be at least 1")]
    NoSteeps,

    #[error("{provided} steep times provided for {required} steeps")]
    MissingSteepTimes { required: u32, provided: usize },

    #[error("steep {steep} has a zero-second duration")]
    ZeroDuration { steep: u32 },

    #[error("current steep {current} is outside 1..={total}")]
    CurrentSteepOutOfRange { current: u32, total: u32 },

    #[error("session {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Brew(#[from] BrewError),
}

/// Failures reported by the sign-in and profile collaborators.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccountError {
    #[error("not signed in")]
    SignedOut,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("an account already exists for {0}")]
    AlreadyRegistered(String),

    #[error("profile {0} not found")]
    ProfileNotFound(String),

    #[error("profile backend unavailable: {0}")]
    Unavailable(String),
}
