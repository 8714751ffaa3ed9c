//! Read-only commands: shares, requirements, proposals, status, history.

use super::context::Context;
use exedao::governance::history::format_history;
use exedao::governance::{Clock, HistoryQuery, MemberId, PayloadHash, ProposalStatus};

/// Show one member's shares, or every member plus the total
pub fn shares(ctx: &Context, member: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let engine = ctx.engine()?;

    if let Some(member) = member {
        let id = MemberId::parse_or_label(member);
        println!("{}: {} shares", id, engine.shares_of(&id));
        return Ok(());
    }

    println!("📊 Shares");
    println!();
    for m in engine.members() {
        println!("  {}  {}", m.id, m.shares);
    }
    println!();
    println!("  Total: {}", engine.total_shares());
    Ok(())
}

/// Show the approval threshold of every governed action
pub fn requirements(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let engine = ctx.engine()?;

    println!("📋 Approval requirements");
    println!();
    for (selector, percent) in engine.requirements() {
        let name = engine
            .dispatch()
            .resolve(&selector)
            .map(|kind| kind.name())
            .unwrap_or("?");
        println!("  {:<26} {}  {}%", name, selector, percent);
    }
    Ok(())
}

/// List live proposals
pub fn proposals(ctx: &Context, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let engine = ctx.engine()?;
    let pending = engine.pending_proposals();

    if json {
        println!("{}", serde_json::to_string_pretty(&pending)?);
        return Ok(());
    }

    if pending.is_empty() {
        println!("No pending proposals.");
        return Ok(());
    }

    println!("⏳ Pending proposals");
    println!();
    for p in &pending {
        println!("• {}", p.action.describe());
        println!(
            "  {} of {} required shares, {} endorsers",
            p.endorsing_weight, p.required_weight, p.endorsers
        );
        match p.expires_at {
            Some(expires_at) => println!("  expires at {}", expires_at),
            None => println!("  never expires"),
        }
        println!("  payload {}", p.payload_hash);
    }
    Ok(())
}

/// Show the status of a payload hash
pub fn status(ctx: &Context, payload: &str) -> Result<(), Box<dyn std::error::Error>> {
    let engine = ctx.engine()?;
    let payload: PayloadHash = payload
        .parse()
        .map_err(|e| format!("Invalid payload hash '{}': {}", payload, e))?;

    match engine.status_of(&payload) {
        ProposalStatus::Absent => println!("Absent"),
        ProposalStatus::Pending {
            endorsing_weight,
            required_weight,
        } => println!(
            "Pending: {} of {} required shares",
            endorsing_weight, required_weight
        ),
        ProposalStatus::Executed => println!("Executed"),
    }
    Ok(())
}

/// Show executed actions, most recent first
pub fn history(ctx: &Context, limit: usize) -> Result<(), Box<dyn std::error::Error>> {
    let engine = ctx.engine()?;
    let records = engine.history(&HistoryQuery {
        limit: Some(limit),
        ..Default::default()
    });
    println!("{}", format_history(&records, engine.clock().now()));
    Ok(())
}

/// Remove expired proposals from the snapshot
pub fn prune(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = ctx.begin()?;
    let removed = session.engine.prune_expired();
    if removed > 0 {
        session.persist()?;
    }
    println!("🧹 Pruned {} expired proposal(s)", removed);
    Ok(())
}
