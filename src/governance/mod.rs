//! Share-weighted governance.
//!
//! A single [`PolicyEngine`] owns all governance state:
//! - Ledger: member shares and total in circulation
//! - Requirement registry: selector -> approval threshold percent
//! - Proposal ledger: endorsements per payload hash
//! - Execution history: append-only log of applied actions
//!
//! Ledger and registry change only when a submission crosses its threshold.

pub mod action;
pub mod clock;
pub mod engine;
pub mod error;
pub mod history;
pub mod ledger;
pub mod proposals;
pub mod requirements;
pub mod types;

#[cfg(test)]
mod proptests;

pub use action::{Action, ActionKind, DispatchTable};
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{
    required_weight, threshold_met, Genesis, GovernanceState, PendingProposal, PolicyEngine,
    ProposalStatus, SubmitOutcome,
};
pub use error::{GovernanceError, GovernanceResult};
pub use history::{ExecutionRecord, HistoryQuery};
pub use ledger::Member;
pub use types::{MemberId, PayloadHash, Selector, Shares};
