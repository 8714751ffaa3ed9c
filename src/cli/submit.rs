//! Governed submissions: mint-shares and set-approval-requirement.
//!
//! Each submission either executes (threshold met) or records the caller's
//! endorsement. Both outcomes are persisted; a rejected submission writes
//! nothing.

use super::context::Context;
use exedao::governance::{Action, ActionKind, MemberId, PolicyEngine, SubmitOutcome, SystemClock};

/// Submit `mint-shares` as `caller`
pub fn mint(
    ctx: &Context,
    member: &str,
    amount: u64,
    caller: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let action = Action::MintShares {
        member: MemberId::parse_or_label(member),
        amount,
    };
    submit(ctx, &action, caller)
}

/// Submit `set-approval-requirement` as `caller`
pub fn set_requirement(
    ctx: &Context,
    kind: ActionKind,
    percent: u8,
    caller: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let action = Action::SetApprovalRequirement {
        selector: kind.selector(),
        percent,
    };
    submit(ctx, &action, caller)
}

fn submit(ctx: &Context, action: &Action, caller: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = ctx.begin()?;
    let caller = MemberId::parse_or_label(caller);
    let payload = action.payload_hash()?;

    let outcome = session.engine.submit_action(action, caller)?;
    session.persist()?;

    print_outcome(&session.engine, action, &outcome);
    println!("   payload {}", payload);
    Ok(())
}

fn print_outcome(engine: &PolicyEngine<SystemClock>, action: &Action, outcome: &SubmitOutcome) {
    match outcome {
        SubmitOutcome::Executed => {
            println!("✅ Executed: {}", action.describe());
            println!("   total shares now {}", engine.total_shares());
        }
        SubmitOutcome::Pending {
            endorsing_weight,
            required_weight,
        } => {
            println!("⏳ Pending: {}", action.describe());
            println!(
                "   {} of {} required shares endorse",
                endorsing_weight, required_weight
            );
        }
    }
}
