//! Execution history.
//!
//! - Append-only log of executed actions (no deletion)
//! - Chronological ordering via execution timestamp
//! - Answers `Executed` status queries after the proposal record is purged

use super::action::{Action, ActionKind};
use super::types::{MemberId, PayloadHash, Shares};
use serde::{Deserialize, Serialize};

/// One executed action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Payload that executed.
    pub payload_hash: PayloadHash,
    /// Action that was applied.
    pub action: Action,
    /// Member whose submission crossed the threshold.
    pub executor: MemberId,
    /// Number of distinct endorsers, executor included.
    pub endorsers: usize,
    /// Endorsing weight at execution.
    pub endorsing_weight: Shares,
    /// Total shares the threshold was measured against.
    pub total_shares: Shares,
    /// Unix timestamp of execution.
    pub executed_at: u64,
}

impl ExecutionRecord {
    /// Format execution time relative to `now`.
    pub fn executed_relative(&self, now: u64) -> String {
        if now < self.executed_at {
            return format!("Unix: {}", self.executed_at);
        }

        let elapsed = now - self.executed_at;
        match elapsed {
            0..=60 => "Just now".to_string(),
            61..=3600 => format!("{} min ago", elapsed / 60),
            3601..=86400 => format!("{} hours ago", elapsed / 3600),
            86401..=604800 => format!("{} days ago", elapsed / 86400),
            _ => format!("Unix: {}", self.executed_at),
        }
    }
}

/// Query options for the execution history.
#[derive(Debug, Clone)]
pub struct HistoryQuery {
    /// Filter by action kind.
    pub kind: Option<ActionKind>,
    /// Filter by executor.
    pub executor: Option<MemberId>,
    /// Limit number of results (most recent first).
    pub limit: Option<usize>,
    /// Only show entries after this timestamp.
    pub after_timestamp: Option<u64>,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            kind: None,
            executor: None,
            limit: Some(50),
            after_timestamp: None,
        }
    }
}

/// Append-only execution log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionHistory {
    records: Vec<ExecutionRecord>,
}

impl ExecutionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(&mut self, record: ExecutionRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Most recent execution of `payload`, if any.
    pub fn last_execution(&self, payload: &PayloadHash) -> Option<&ExecutionRecord> {
        self.records
            .iter()
            .rev()
            .find(|r| &r.payload_hash == payload)
    }

    /// Filtered records, most recent first.
    pub fn query(&self, query: &HistoryQuery) -> Vec<ExecutionRecord> {
        let mut filtered: Vec<ExecutionRecord> = self
            .records
            .iter()
            .filter(|record| {
                if let Some(kind) = query.kind {
                    if record.action.kind() != kind {
                        return false;
                    }
                }

                if let Some(ref executor) = query.executor {
                    if &record.executor != executor {
                        return false;
                    }
                }

                if let Some(after_ts) = query.after_timestamp {
                    if record.executed_at <= after_ts {
                        return false;
                    }
                }

                true
            })
            .cloned()
            .collect();

        // Appended in execution order; a stable reverse keeps same-second
        // executions in reverse append order too.
        filtered.reverse();

        if let Some(limit) = query.limit {
            filtered.truncate(limit);
        }

        filtered
    }
}

/// Format records for terminal display.
pub fn format_history(records: &[ExecutionRecord], now: u64) -> String {
    if records.is_empty() {
        return "No executed actions.".to_string();
    }

    let mut output = String::from("Executed actions\n\n");

    for record in records {
        output.push_str(&format!(
            "• {} - {} (by {}…, {} endorsers, {}/{} shares)\n  payload {}\n\n",
            record.executed_relative(now),
            record.action.describe(),
            record.executor.short(),
            record.endorsers,
            record.endorsing_weight,
            record.total_shares,
            record.payload_hash,
        ));
    }

    output.trim_end().to_string()
}
