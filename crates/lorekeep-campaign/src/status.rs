//! Campaign lifecycle legality.
//!
//! Two questions are answered here and nowhere else: may the campaign move
//! from one status to another, and may a given kind of operation run
//! against a campaign in its current status.
//!
//! ```text
//! Draft --start--> Active --end-----> Completed
//!                    |
//!                    +--archive--> Archived --restore--> Draft
//! ```

use lorekeep_types::{CampaignStatus, InvalidStateError};

/// Kinds of operation gated by campaign status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CampaignOperation {
    /// Reading projections or the log.
    Read,
    /// Editing campaign, participant, or character data.
    Mutate,
    /// Starting a play session.
    SessionStart,
    /// Acting inside a play session (gates, spotlight, rolls, state).
    SessionAction,
    /// Ending the campaign (Active -> Completed).
    End,
    /// Archiving the campaign (Active -> Archived).
    Archive,
    /// Restoring an archived campaign to draft.
    Restore,
}

impl CampaignOperation {
    /// Human-readable operation name for error messages.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Mutate => "mutate",
            Self::SessionStart => "start session",
            Self::SessionAction => "session action",
            Self::End => "end",
            Self::Archive => "archive",
            Self::Restore => "restore",
        }
    }
}

/// Whether `op` is permitted while the campaign is in `status`.
pub const fn is_operation_allowed(status: CampaignStatus, op: CampaignOperation) -> bool {
    use CampaignOperation as Op;

    match status {
        CampaignStatus::Draft => matches!(
            op,
            Op::Read | Op::Mutate | Op::SessionStart | Op::SessionAction
        ),
        CampaignStatus::Active => !matches!(op, Op::Restore),
        CampaignStatus::Completed => matches!(op, Op::Read),
        CampaignStatus::Archived => matches!(op, Op::Read | Op::Restore),
    }
}

/// Check that `op` is permitted while the campaign is in `status`.
///
/// # Errors
///
/// Returns [`InvalidStateError`] naming the status and operation.
pub fn validate_campaign_operation(
    status: CampaignStatus,
    op: CampaignOperation,
) -> Result<(), InvalidStateError> {
    if is_operation_allowed(status, op) {
        Ok(())
    } else {
        Err(InvalidStateError::new(format!(
            "campaign status {status} does not allow {}",
            op.as_str()
        )))
    }
}

/// Whether `from -> to` is an edge of the lifecycle graph.
pub const fn is_legal_transition(from: CampaignStatus, to: CampaignStatus) -> bool {
    use CampaignStatus as S;

    matches!(
        (from, to),
        (S::Draft, S::Active)
            | (S::Active, S::Completed | S::Archived)
            | (S::Archived, S::Draft)
    )
}

/// Check a status change.
///
/// `has_active_session` must reflect whether the campaign currently has a
/// non-terminal session; no status change is permitted while one exists.
///
/// # Errors
///
/// Returns [`InvalidStateError`] for any edge not in the lifecycle graph
/// (including self-transitions) or when a session is still active.
pub fn validate_transition(
    from: CampaignStatus,
    to: CampaignStatus,
    has_active_session: bool,
) -> Result<(), InvalidStateError> {
    if has_active_session {
        return Err(InvalidStateError::new(format!(
            "campaign cannot move from {from} to {to} while a session is active"
        )));
    }
    if !is_legal_transition(from, to) {
        return Err(InvalidStateError::new(format!(
            "campaign cannot move from {from} to {to}"
        )));
    }
    Ok(())
}
