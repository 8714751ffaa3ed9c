//! Policy engine.
//!
//! Owns the ledger, the requirement registry, the proposal ledger and the
//! execution history. Every privileged action enters through [`PolicyEngine::submit`]:
//!
//! 1. Hash selector ++ arguments into the payload hash
//! 2. Resolve the selector's threshold (fail closed when absent)
//! 3. Decode the arguments (canonical encoding only) and validate them
//! 4. Drop an expired proposal for the payload
//! 5. Look up the caller's weight (must be non-zero)
//! 6. Combine with prior endorsements (distinct endorsers only)
//! 7. Execute when `weight * 100 >= threshold * total_shares`, else record
//!
//! Validation happens before mutation: an error leaves every component as
//! it was.

use super::action::{Action, ActionKind, DispatchTable};
use super::clock::{Clock, SystemClock};
use super::error::{GovernanceError, GovernanceResult};
use super::history::{ExecutionHistory, ExecutionRecord, HistoryQuery};
use super::ledger::{Ledger, Member};
use super::proposals::{Proposal, ProposalLedger};
use super::requirements::{RequirementRegistry, MAX_PERCENT};
use super::types::{MemberId, PayloadHash, Selector, Shares};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Snapshot schema version.
pub const SCHEMA_VERSION: u64 = 1;

/// Immutable construction parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Genesis {
    /// Founding member.
    pub founder: MemberId,
    /// Shares minted to the founder.
    pub initial_shares: Shares,
    /// Lifetime of proposals in seconds; 0 means never expires.
    pub proposal_duration_secs: u64,
    /// Initial thresholds.
    pub requirements: Vec<(Selector, u8)>,
}

impl Genesis {
    pub fn new(founder: MemberId, initial_shares: Shares, proposal_duration_secs: u64) -> Self {
        Self {
            founder,
            initial_shares,
            proposal_duration_secs,
            requirements: Vec::new(),
        }
    }

    /// Add a threshold for a governed action kind.
    pub fn with_requirement(self, kind: ActionKind, percent: u8) -> Self {
        self.with_selector_requirement(kind.selector(), percent)
    }

    /// Add a threshold for a raw selector (validated at construction).
    pub fn with_selector_requirement(mut self, selector: Selector, percent: u8) -> Self {
        self.requirements.push((selector, percent));
        self
    }
}

/// Everything the engine persists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceState {
    pub schema_version: u64,
    pub ledger: Ledger,
    pub requirements: RequirementRegistry,
    pub proposals: ProposalLedger,
    #[serde(default)]
    pub history: ExecutionHistory,
}

/// Result of a successful submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmitOutcome {
    /// Threshold met; the action was applied.
    Executed,
    /// Endorsement recorded; threshold not yet met.
    Pending {
        endorsing_weight: Shares,
        required_weight: Shares,
    },
}

/// Status of a payload hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalStatus {
    /// No live proposal and no recorded execution.
    Absent,
    Pending {
        endorsing_weight: Shares,
        required_weight: Shares,
    },
    Executed,
}

/// Live proposal as presented to readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingProposal {
    pub payload_hash: PayloadHash,
    pub action: Action,
    pub endorsing_weight: Shares,
    pub required_weight: Shares,
    pub endorsers: usize,
    pub created_at: u64,
    pub expires_at: Option<u64>,
}

/// Whether `endorsing_weight` meets `threshold` percent of `total_shares`.
///
/// Cross-multiplied in u128: no division, no rounding, no overflow.
pub fn threshold_met(endorsing_weight: Shares, threshold: u8, total_shares: Shares) -> bool {
    u128::from(endorsing_weight) * 100 >= u128::from(threshold) * u128::from(total_shares)
}

/// Smallest weight satisfying [`threshold_met`]: `ceil(threshold * total / 100)`.
pub fn required_weight(threshold: u8, total_shares: Shares) -> Shares {
    let product = u128::from(threshold) * u128::from(total_shares);
    let required = product.div_ceil(100);
    // threshold <= 100 keeps this at or below total_shares.
    Shares::try_from(required).unwrap_or(Shares::MAX)
}

/// Share-weighted policy engine.
#[derive(Debug, Clone)]
pub struct PolicyEngine<C: Clock = SystemClock> {
    state: GovernanceState,
    dispatch: DispatchTable,
    clock: C,
}

impl PolicyEngine<SystemClock> {
    /// Build from genesis using the wall clock.
    pub fn genesis(genesis: Genesis) -> GovernanceResult<Self> {
        Self::with_clock(genesis, SystemClock)
    }
}

impl<C: Clock> PolicyEngine<C> {
    /// Build from genesis with an explicit clock.
    pub fn with_clock(genesis: Genesis, clock: C) -> GovernanceResult<Self> {
        let dispatch = DispatchTable::genesis();

        let mut requirements = RequirementRegistry::new();
        for &(selector, percent) in &genesis.requirements {
            dispatch.resolve(&selector)?;
            requirements.set_threshold(selector, percent)?;
        }

        let mut ledger = Ledger::new();
        ledger.mint(&genesis.founder, genesis.initial_shares)?;

        info!(
            founder = %genesis.founder.short(),
            shares = genesis.initial_shares,
            duration_secs = genesis.proposal_duration_secs,
            requirements = genesis.requirements.len(),
            "policy engine initialized"
        );

        Ok(Self {
            state: GovernanceState {
                schema_version: SCHEMA_VERSION,
                ledger,
                requirements,
                proposals: ProposalLedger::new(genesis.proposal_duration_secs),
                history: ExecutionHistory::new(),
            },
            dispatch,
            clock,
        })
    }

    /// Restore from a persisted snapshot.
    pub fn from_state(state: GovernanceState, clock: C) -> Self {
        Self {
            state,
            dispatch: DispatchTable::genesis(),
            clock,
        }
    }

    /// Snapshot for persistence.
    pub fn state(&self) -> &GovernanceState {
        &self.state
    }

    pub fn into_state(self) -> GovernanceState {
        self.state
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn dispatch(&self) -> &DispatchTable {
        &self.dispatch
    }

    pub fn total_shares(&self) -> Shares {
        self.state.ledger.total_shares()
    }

    pub fn shares_of(&self, member: &MemberId) -> Shares {
        self.state.ledger.shares_of(member)
    }

    pub fn member(&self, member: &MemberId) -> Option<Member> {
        self.state.ledger.member(member)
    }

    pub fn members(&self) -> impl Iterator<Item = Member> + '_ {
        self.state.ledger.members()
    }

    pub fn threshold_for(&self, selector: &Selector) -> Option<u8> {
        self.state.requirements.threshold_for(selector)
    }

    pub fn requirements(&self) -> impl Iterator<Item = (Selector, u8)> + '_ {
        self.state.requirements.iter()
    }

    pub fn proposal_duration_secs(&self) -> u64 {
        self.state.proposals.duration_secs()
    }

    /// Live proposal for `payload`, if any.
    pub fn proposal(&self, payload: &PayloadHash) -> Option<&Proposal> {
        self.state.proposals.live(payload, self.clock.now())
    }

    /// Current status of `payload`. A live proposal takes precedence over
    /// an earlier execution of the same payload.
    pub fn status_of(&self, payload: &PayloadHash) -> ProposalStatus {
        if let Some(proposal) = self.proposal(payload) {
            return ProposalStatus::Pending {
                endorsing_weight: proposal.endorsing_weight,
                required_weight: self.required_for(&proposal.action.selector()),
            };
        }
        if self.state.history.last_execution(payload).is_some() {
            return ProposalStatus::Executed;
        }
        ProposalStatus::Absent
    }

    /// Live proposals, in payload-hash order.
    pub fn pending_proposals(&self) -> Vec<PendingProposal> {
        self.state
            .proposals
            .iter_live(self.clock.now())
            .map(|(payload, proposal)| PendingProposal {
                payload_hash: *payload,
                action: proposal.action.clone(),
                endorsing_weight: proposal.endorsing_weight,
                required_weight: self.required_for(&proposal.action.selector()),
                endorsers: proposal.endorsers.len(),
                created_at: proposal.created_at,
                expires_at: proposal.expires_at,
            })
            .collect()
    }

    /// Executed actions matching `query`, most recent first.
    pub fn history(&self, query: &HistoryQuery) -> Vec<ExecutionRecord> {
        self.state.history.query(query)
    }

    /// Drop every expired proposal. Returns how many were removed.
    pub fn prune_expired(&mut self) -> usize {
        let removed = self.state.proposals.prune_expired(self.clock.now());
        if removed > 0 {
            debug!(removed, "expired proposals pruned");
        }
        removed
    }

    /// Encode and submit a locally built action.
    pub fn submit_action(
        &mut self,
        action: &Action,
        caller: MemberId,
    ) -> GovernanceResult<SubmitOutcome> {
        let (selector, arguments) =
            action
                .encode()
                .map_err(|e| GovernanceError::MalformedArguments {
                    selector: action.selector(),
                    reason: e.to_string(),
                })?;
        self.submit(selector, &arguments, caller)
    }

    /// Submit (or endorse) an encoded action on behalf of `caller`.
    pub fn submit(
        &mut self,
        selector: Selector,
        arguments: &[u8],
        caller: MemberId,
    ) -> GovernanceResult<SubmitOutcome> {
        let result = self.try_submit(selector, arguments, caller);
        if let Err(ref e) = result {
            warn!(%selector, caller = %caller.short(), error = %e, "submission rejected");
        }
        result
    }

    fn try_submit(
        &mut self,
        selector: Selector,
        arguments: &[u8],
        caller: MemberId,
    ) -> GovernanceResult<SubmitOutcome> {
        let now = self.clock.now();
        let payload = PayloadHash::compute(&selector, arguments);

        let threshold = self
            .state
            .requirements
            .threshold_for(&selector)
            .ok_or(GovernanceError::UngovernedAction(selector))?;

        let action = self.dispatch.decode(&selector, arguments)?;

        // Lazy expiry: an expired record is already logically absent.
        if self.state.proposals.prune_if_expired(&payload, now) {
            debug!(payload = %payload.short(), "expired proposal pruned");
        }

        let weight = self.state.ledger.shares_of(&caller);
        if weight == 0 {
            return Err(GovernanceError::ZeroWeightCaller);
        }

        self.preflight(&action)?;

        let endorsement = self
            .state
            .proposals
            .preview_endorsement(&payload, &caller, weight, now)?;
        let total_shares = self.state.ledger.total_shares();

        if !threshold_met(endorsement.endorsing_weight, threshold, total_shares) {
            self.state
                .proposals
                .record_endorsement(payload, &action, caller, weight, now)?;
            let required_weight = required_weight(threshold, total_shares);
            debug!(
                payload = %payload.short(),
                caller = %caller.short(),
                new_endorser = endorsement.is_new_endorser,
                weight = endorsement.endorsing_weight,
                required = required_weight,
                "endorsement recorded"
            );
            return Ok(SubmitOutcome::Pending {
                endorsing_weight: endorsement.endorsing_weight,
                required_weight,
            });
        }

        let prior_endorsers = self
            .state
            .proposals
            .live(&payload, now)
            .map_or(0, |p| p.endorsers.len());
        let endorsers = prior_endorsers + usize::from(endorsement.is_new_endorser);

        self.apply(&action)?;
        self.state.proposals.purge(&payload);
        self.state.history.append(ExecutionRecord {
            payload_hash: payload,
            action: action.clone(),
            executor: caller,
            endorsers,
            endorsing_weight: endorsement.endorsing_weight,
            total_shares,
            executed_at: now,
        });

        info!(
            payload = %payload.short(),
            action = %action.describe(),
            executor = %caller.short(),
            weight = endorsement.endorsing_weight,
            total_shares,
            threshold,
            "action executed"
        );

        Ok(SubmitOutcome::Executed)
    }

    /// Check the action's arithmetic against current state.
    fn preflight(&self, action: &Action) -> GovernanceResult<()> {
        match action {
            Action::MintShares { member, amount } => {
                self.state.ledger.check_mint(member, *amount).map(|_| ())
            }
            Action::SetApprovalRequirement { percent, .. } => {
                RequirementRegistry::check_percent(*percent)
            }
        }
    }

    fn apply(&mut self, action: &Action) -> GovernanceResult<()> {
        match *action {
            Action::MintShares { member, amount } => self.state.ledger.mint(&member, amount),
            Action::SetApprovalRequirement { selector, percent } => {
                self.state.requirements.set_threshold(selector, percent)
            }
        }
    }

    fn required_for(&self, selector: &Selector) -> Shares {
        // Requirements are never removed, so a live proposal's selector
        // always has one.
        let threshold = self.threshold_for(selector).unwrap_or(MAX_PERCENT);
        required_weight(threshold, self.total_shares())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::governance::clock::ManualClock;

    fn member(byte: u8) -> MemberId {
        MemberId::from_bytes([byte; 32])
    }

    fn engine(shares: Shares, duration: u64, percent: u8) -> PolicyEngine<ManualClock> {
        let genesis = Genesis::new(member(0), shares, duration)
            .with_requirement(ActionKind::MintShares, percent)
            .with_requirement(ActionKind::SetApprovalRequirement, percent);
        PolicyEngine::with_clock(genesis, ManualClock::new(1_000)).unwrap()
    }

    fn mint(to: u8, amount: Shares) -> Action {
        Action::MintShares {
            member: member(to),
            amount,
        }
    }

    #[test]
    fn test_threshold_met_is_exact() {
        assert!(!threshold_met(51, 51, 102));
        assert!(threshold_met(53, 51, 102));
        assert!(threshold_met(51, 51, 100));
        assert!(threshold_met(0, 0, 100));
        assert!(threshold_met(u64::MAX, 100, u64::MAX));
    }

    #[test]
    fn test_required_weight_is_ceiling() {
        assert_eq!(required_weight(51, 102), 53);
        assert_eq!(required_weight(51, 100), 51);
        assert_eq!(required_weight(0, 100), 0);
        assert_eq!(required_weight(100, u64::MAX), u64::MAX);
    }

    #[test]
    fn test_genesis_seeds_state() {
        let engine = engine(1000, 0, 51);
        assert_eq!(engine.total_shares(), 1000);
        assert_eq!(engine.shares_of(&member(0)), 1000);
        assert_eq!(engine.threshold_for(&ActionKind::MintShares.selector()), Some(51));
        assert_eq!(engine.requirements().count(), 2);
    }

    #[test]
    fn test_genesis_rejects_invalid_configuration() {
        let zero = Genesis::new(member(0), 0, 0);
        assert_eq!(
            PolicyEngine::with_clock(zero, ManualClock::new(0)).unwrap_err(),
            GovernanceError::InvalidAmount
        );

        let percent = Genesis::new(member(0), 1, 0).with_requirement(ActionKind::MintShares, 101);
        assert_eq!(
            PolicyEngine::with_clock(percent, ManualClock::new(0)).unwrap_err(),
            GovernanceError::InvalidPercent(101)
        );

        let dangling = Selector::from_bytes([7; 4]);
        let unknown = Genesis::new(member(0), 1, 0).with_selector_requirement(dangling, 10);
        assert_eq!(
            PolicyEngine::with_clock(unknown, ManualClock::new(0)).unwrap_err(),
            GovernanceError::UnknownSelector(dangling)
        );
    }

    #[test]
    fn test_self_sufficient_caller_executes_immediately() {
        let mut engine = engine(1000, 0, 51);
        let outcome = engine.submit_action(&mint(1, 501), member(0)).unwrap();
        assert_eq!(outcome, SubmitOutcome::Executed);
        assert_eq!(engine.shares_of(&member(1)), 501);
        assert_eq!(engine.total_shares(), 1501);
        assert_eq!(
            engine.status_of(&mint(1, 501).payload_hash().unwrap()),
            ProposalStatus::Executed
        );
    }

    #[test]
    fn test_ungoverned_selector_fails_closed() {
        let genesis = Genesis::new(member(0), 10, 0).with_requirement(ActionKind::MintShares, 51);
        let mut engine = PolicyEngine::with_clock(genesis, ManualClock::new(0)).unwrap();
        let action = Action::SetApprovalRequirement {
            selector: ActionKind::MintShares.selector(),
            percent: 10,
        };
        assert_eq!(
            engine.submit_action(&action, member(0)),
            Err(GovernanceError::UngovernedAction(
                ActionKind::SetApprovalRequirement.selector()
            ))
        );
    }

    #[test]
    fn test_unregistered_selector_is_ungoverned_before_unknown() {
        let mut engine = engine(100, 0, 51);
        let stray = Selector::from_bytes([7; 4]);
        assert!(!engine.dispatch().contains(&stray));
        assert_eq!(
            engine.submit(stray, b"anything", member(0)),
            Err(GovernanceError::UngovernedAction(stray))
        );
        // Even a caller without shares learns the action is ungoverned first.
        assert_eq!(
            engine.submit(stray, &[], member(9)),
            Err(GovernanceError::UngovernedAction(stray))
        );
    }

    #[test]
    fn test_alternative_encoding_cannot_split_endorsements() {
        #[derive(serde::Serialize)]
        struct LooseMint {
            member: String,
            amount: Shares,
        }

        let mut engine = engine(51, 0, 51);
        engine.submit_action(&mint(1, 49), member(0)).unwrap();
        engine.submit_action(&mint(2, 2), member(0)).unwrap();
        engine.submit_action(&mint(2, 10), member(0)).unwrap();
        let before = engine.state().clone();

        let loose = crate::serialization::to_cbor(&LooseMint {
            member: format!("0x{}", member(2).to_string().to_uppercase()),
            amount: 10,
        })
        .unwrap();
        assert!(matches!(
            engine.submit(ActionKind::MintShares.selector(), &loose, member(2)),
            Err(GovernanceError::MalformedArguments { .. })
        ));
        assert_eq!(engine.state(), &before);

        // The canonical bytes still reach the one live proposal.
        assert_eq!(engine.pending_proposals().len(), 1);
        assert_eq!(
            engine.submit_action(&mint(2, 10), member(2)).unwrap(),
            SubmitOutcome::Executed
        );
        assert_eq!(engine.shares_of(&member(2)), 12);
    }

    #[test]
    fn test_zero_weight_caller_rejected() {
        let mut engine = engine(100, 0, 51);
        let before = engine.state().clone();
        assert_eq!(
            engine.submit_action(&mint(1, 5), member(9)),
            Err(GovernanceError::ZeroWeightCaller)
        );
        assert_eq!(engine.state(), &before);
    }

    #[test]
    fn test_invalid_arguments_rejected_before_mutation() {
        let mut engine = engine(100, 0, 51);
        let before = engine.state().clone();

        assert_eq!(
            engine.submit_action(&mint(1, 0), member(0)),
            Err(GovernanceError::InvalidAmount)
        );
        let bad_percent = Action::SetApprovalRequirement {
            selector: ActionKind::MintShares.selector(),
            percent: 150,
        };
        assert_eq!(
            engine.submit_action(&bad_percent, member(0)),
            Err(GovernanceError::InvalidPercent(150))
        );
        let garbage = engine.submit(ActionKind::MintShares.selector(), b"not cbor", member(0));
        assert!(matches!(
            garbage,
            Err(GovernanceError::MalformedArguments { .. })
        ));

        assert_eq!(engine.state(), &before);
    }

    #[test]
    fn test_overflowing_mint_rejected_without_recording() {
        let mut engine = engine(10, 0, 100);
        // Founder has 100% and would execute; the mint itself overflows.
        let outcome = engine.submit_action(&mint(1, u64::MAX), member(0));
        assert_eq!(outcome, Err(GovernanceError::Overflow));
        assert_eq!(engine.total_shares(), 10);
        assert!(engine.pending_proposals().is_empty());
    }

    #[test]
    fn test_repeat_submission_does_not_double_count() {
        let mut engine = engine(51, 0, 51);
        engine.submit_action(&mint(1, 49), member(0)).unwrap();
        engine.submit_action(&mint(2, 2), member(0)).unwrap();

        let first = engine.submit_action(&mint(2, 10), member(0)).unwrap();
        let second = engine.submit_action(&mint(2, 10), member(0)).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first,
            SubmitOutcome::Pending {
                endorsing_weight: 51,
                required_weight: 53
            }
        );
    }

    #[test]
    fn test_zero_threshold_executes_for_any_member() {
        let mut engine = engine(100, 0, 0);
        engine.submit_action(&mint(1, 1), member(0)).unwrap();
        assert_eq!(
            engine.submit_action(&mint(2, 1), member(1)).unwrap(),
            SubmitOutcome::Executed
        );
    }

    #[test]
    fn test_status_lifecycle() {
        let mut engine = engine(51, 0, 51);
        engine.submit_action(&mint(1, 49), member(0)).unwrap();
        engine.submit_action(&mint(2, 2), member(0)).unwrap();

        let action = mint(2, 10);
        let payload = action.payload_hash().unwrap();
        assert_eq!(engine.status_of(&payload), ProposalStatus::Absent);

        engine.submit_action(&action, member(0)).unwrap();
        assert_eq!(
            engine.status_of(&payload),
            ProposalStatus::Pending {
                endorsing_weight: 51,
                required_weight: 53
            }
        );
        assert_eq!(engine.pending_proposals().len(), 1);

        engine.submit_action(&action, member(2)).unwrap();
        assert_eq!(engine.status_of(&payload), ProposalStatus::Executed);
        assert!(engine.proposal(&payload).is_none());

        let record = &engine.history(&HistoryQuery::default())[0];
        assert_eq!(record.executor, member(2));
        assert_eq!(record.endorsers, 2);
        assert_eq!(record.endorsing_weight, 53);
        assert_eq!(record.total_shares, 102);
    }

    #[test]
    fn test_expired_proposal_reads_as_absent_and_is_pruned() {
        let mut engine = engine(51, 5, 51);
        engine.submit_action(&mint(1, 49), member(0)).unwrap();
        engine.submit_action(&mint(2, 2), member(0)).unwrap();

        let action = mint(2, 10);
        let payload = action.payload_hash().unwrap();
        engine.submit_action(&action, member(0)).unwrap();
        assert!(matches!(engine.status_of(&payload), ProposalStatus::Pending { .. }));

        engine.clock().advance(5);
        assert_eq!(engine.status_of(&payload), ProposalStatus::Absent);
        assert!(engine.pending_proposals().is_empty());
        assert_eq!(engine.prune_expired(), 1);
        assert_eq!(engine.prune_expired(), 0);
    }

    #[test]
    fn test_restore_from_state() {
        let mut engine = engine(51, 0, 51);
        engine.submit_action(&mint(1, 49), member(0)).unwrap();
        let state = engine.state().clone();

        let restored = PolicyEngine::from_state(state, ManualClock::new(2_000));
        assert_eq!(restored.total_shares(), 100);
        assert_eq!(restored.shares_of(&member(1)), 49);
        assert_eq!(restored.history(&HistoryQuery::default()).len(), 1);
    }
}
