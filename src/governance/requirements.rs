//! Approval requirement registry.
//!
//! Maps a selector to the percentage of total shares that must endorse a
//! payload before it executes. Only the policy engine writes to it, and only
//! through a governed set-approval-requirement action.

use super::error::{GovernanceError, GovernanceResult};
use super::types::Selector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Largest valid threshold.
pub const MAX_PERCENT: u8 = 100;

/// Selector -> threshold percent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementRegistry {
    thresholds: BTreeMap<Selector, u8>,
}

impl RequirementRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Threshold registered for `selector`, if any.
    pub fn threshold_for(&self, selector: &Selector) -> Option<u8> {
        self.thresholds.get(selector).copied()
    }

    /// All registered requirements in selector order.
    pub fn iter(&self) -> impl Iterator<Item = (Selector, u8)> + '_ {
        self.thresholds.iter().map(|(&s, &p)| (s, p))
    }

    /// Validate a threshold percent.
    pub fn check_percent(percent: u8) -> GovernanceResult<()> {
        if percent > MAX_PERCENT {
            return Err(GovernanceError::InvalidPercent(percent.into()));
        }
        Ok(())
    }

    /// Set (or overwrite) the threshold for `selector`.
    pub(crate) fn set_threshold(&mut self, selector: Selector, percent: u8) -> GovernanceResult<()> {
        Self::check_percent(percent)?;
        self.thresholds.insert(selector, percent);
        Ok(())
    }
}
