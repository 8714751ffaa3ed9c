//! exedao - share-weighted policy engine
//!
//! Gates privileged actions behind approval thresholds measured in shares.
//!
//! Key principles:
//! - Single owner of all governance state (no ambient globals)
//! - Closed set of executable actions, fixed at genesis
//! - Integer cross-multiplication for thresholds (no rounding)
//! - Validate, then mutate: rejected submissions change nothing
//! - Changing a threshold is itself a governed action

pub mod governance;
pub mod serialization;
pub mod store;

pub use governance::{
    Action, ActionKind, Genesis, GovernanceError, GovernanceResult, MemberId, PayloadHash,
    PolicyEngine, ProposalStatus, Selector, Shares, SubmitOutcome,
};
