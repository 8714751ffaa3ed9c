//! Errors raised by the policy engine.
//!
//! Every variant is terminal for the submission that raised it, and no
//! state is mutated before it is returned.

use super::types::Selector;
use thiserror::Error;

/// Policy engine error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GovernanceError {
    /// Mint of zero shares.
    #[error("invalid amount: minted shares must be greater than zero")]
    InvalidAmount,

    /// Threshold outside [0, 100].
    #[error("invalid percent {0}: thresholds must be within 0..=100")]
    InvalidPercent(u64),

    /// Selector has no registered threshold.
    #[error("ungoverned action {0}: no approval requirement registered")]
    UngovernedAction(Selector),

    /// Selector is not in the dispatch table.
    #[error("unknown selector {0}: no executable action")]
    UnknownSelector(Selector),

    /// Argument bytes are not the canonical encoding of an action of the
    /// selector's kind.
    #[error("malformed arguments for {selector}: {reason}")]
    MalformedArguments { selector: Selector, reason: String },

    /// Caller holds no shares.
    #[error("caller holds no shares and cannot endorse")]
    ZeroWeightCaller,

    /// Weight arithmetic would exceed the representable range.
    #[error("share arithmetic overflow")]
    Overflow,
}

/// Result type for policy engine operations.
pub type GovernanceResult<T> = Result<T, GovernanceError>;
