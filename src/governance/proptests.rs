//! Property-based tests for the policy engine
//!
//! Tests for:
//! - Conservation: total shares equals the sum of member shares
//! - Idempotence: repeat endorsements never add weight
//! - Exactness: cross-multiplied comparison agrees with the ceiling weight
//! - Atomicity: rejected submissions leave state untouched

use super::{
    required_weight, threshold_met, Action, ActionKind, Genesis, ManualClock, MemberId,
    PolicyEngine, SubmitOutcome,
};
use proptest::prelude::*;

// Helper to generate test member ids
fn test_member(id: u8) -> MemberId {
    let mut bytes = [0u8; 32];
    bytes[0] = id;
    MemberId::from_bytes(bytes)
}

fn engine(founder_shares: u64, percent: u8) -> PolicyEngine<ManualClock> {
    let genesis = Genesis::new(test_member(0), founder_shares, 0)
        .with_requirement(ActionKind::MintShares, percent)
        .with_requirement(ActionKind::SetApprovalRequirement, percent);
    PolicyEngine::with_clock(genesis, ManualClock::new(0)).unwrap()
}

proptest! {
    /// Property: Conservation
    /// After any sequence of submissions, total shares equals the sum of balances
    #[test]
    fn prop_conservation(
        founder_shares in 1u64..1_000,
        percent in 0u8..=100,
        ops in prop::collection::vec((0u8..6, 0u8..6, 0u64..500), 1..40),
    ) {
        let mut engine = engine(founder_shares, percent);

        for (caller, target, amount) in ops {
            let action = Action::MintShares { member: test_member(target), amount };
            let _ = engine.submit_action(&action, test_member(caller));

            let sum: u64 = engine.members().map(|m| m.shares).sum();
            prop_assert_eq!(sum, engine.total_shares());
        }
    }

    /// Property: Idempotent endorsement
    /// Submitting the same payload twice from the same caller yields the same weight
    #[test]
    fn prop_repeat_endorsement_is_idempotent(
        founder_shares in 1u64..1_000,
        other_shares in 1u64..1_000,
        amount in 1u64..1_000,
    ) {
        let mut engine = engine(founder_shares, 100);
        // Founder holds 100% at genesis, so this mint executes.
        engine
            .submit_action(&Action::MintShares { member: test_member(1), amount: other_shares }, test_member(0))
            .unwrap();

        let action = Action::MintShares { member: test_member(2), amount };
        let first = engine.submit_action(&action, test_member(1)).unwrap();
        let second = engine.submit_action(&action, test_member(1)).unwrap();

        prop_assert_eq!(first, second);
        prop_assert_eq!(
            first,
            SubmitOutcome::Pending { endorsing_weight: other_shares, required_weight: founder_shares + other_shares }
        );
    }

    /// Property: Exactness
    /// weight * 100 >= threshold * total  <=>  weight >= ceil(threshold * total / 100)
    #[test]
    fn prop_threshold_matches_ceiling(
        weight in any::<u64>(),
        threshold in 0u8..=100,
        total in any::<u64>(),
    ) {
        prop_assert_eq!(
            threshold_met(weight, threshold, total),
            weight >= required_weight(threshold, total)
        );
        prop_assert!(required_weight(threshold, total) <= total);
    }

    /// Property: Atomicity
    /// Rejected submissions never change the persisted state
    #[test]
    fn prop_rejections_leave_state_untouched(
        founder_shares in 1u64..1_000,
        percent in 0u8..=100,
        outsider in 10u8..20,
        bad_percent in 101u8..=255,
    ) {
        let mut engine = engine(founder_shares, percent);
        let before = engine.state().clone();

        let zero_mint = Action::MintShares { member: test_member(1), amount: 0 };
        prop_assert!(engine.submit_action(&zero_mint, test_member(0)).is_err());

        let outsider_mint = Action::MintShares { member: test_member(1), amount: 1 };
        prop_assert!(engine.submit_action(&outsider_mint, test_member(outsider)).is_err());

        let bad_requirement = Action::SetApprovalRequirement {
            selector: ActionKind::MintShares.selector(),
            percent: bad_percent,
        };
        prop_assert!(engine.submit_action(&bad_requirement, test_member(0)).is_err());

        prop_assert_eq!(engine.state(), &before);
    }
}
