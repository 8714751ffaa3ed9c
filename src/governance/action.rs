//! Governed actions and the selector dispatch table.
//!
//! The set of executable actions is closed. A payload is a selector plus
//! CBOR-encoded arguments; the dispatch table maps the selector back to an
//! [`ActionKind`] and decodes the arguments into an [`Action`].

use super::error::{GovernanceError, GovernanceResult};
use super::requirements::RequirementRegistry;
use super::types::{MemberId, PayloadHash, Selector, Shares};
use crate::serialization::{from_canonical_cbor, to_cbor, SerializationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Kinds of governed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    MintShares,
    SetApprovalRequirement,
}

impl ActionKind {
    /// Every executable kind.
    pub const ALL: [ActionKind; 2] = [ActionKind::MintShares, ActionKind::SetApprovalRequirement];

    /// Canonical signature the selector is derived from.
    pub fn signature(&self) -> &'static str {
        match self {
            ActionKind::MintShares => "mintShares(address,uint64)",
            ActionKind::SetApprovalRequirement => "setApprovalRequirement(bytes4,uint8)",
        }
    }

    pub fn selector(&self) -> Selector {
        Selector::from_signature(self.signature())
    }

    /// Name used on the command line and in config files.
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::MintShares => "mint-shares",
            ActionKind::SetApprovalRequirement => "set-approval-requirement",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| {
                format!(
                    "Unknown action: {}. Use 'mint-shares' or 'set-approval-requirement'.",
                    s
                )
            })
    }
}

/// A decoded governed action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Mint `amount` shares to `member`.
    MintShares { member: MemberId, amount: Shares },
    /// Set the approval threshold of `selector` to `percent`.
    SetApprovalRequirement { selector: Selector, percent: u8 },
}

#[derive(Serialize, Deserialize)]
struct MintSharesArgs {
    member: MemberId,
    amount: Shares,
}

// Wider than the threshold type so an out-of-range percent decodes and is
// reported as such. CBOR integers are minimal-width, so the encoding of an
// in-range percent is the same either way.
#[derive(Serialize, Deserialize)]
struct SetApprovalRequirementArgs {
    selector: Selector,
    percent: u64,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::MintShares { .. } => ActionKind::MintShares,
            Action::SetApprovalRequirement { .. } => ActionKind::SetApprovalRequirement,
        }
    }

    pub fn selector(&self) -> Selector {
        self.kind().selector()
    }

    /// CBOR-encode the action's arguments.
    pub fn encode_arguments(&self) -> Result<Vec<u8>, SerializationError> {
        match *self {
            Action::MintShares { member, amount } => to_cbor(&MintSharesArgs { member, amount }),
            Action::SetApprovalRequirement { selector, percent } => {
                to_cbor(&SetApprovalRequirementArgs {
                    selector,
                    percent: percent.into(),
                })
            }
        }
    }

    /// Selector and encoded arguments, as submitted to the engine.
    pub fn encode(&self) -> Result<(Selector, Vec<u8>), SerializationError> {
        Ok((self.selector(), self.encode_arguments()?))
    }

    pub fn payload_hash(&self) -> Result<PayloadHash, SerializationError> {
        let (selector, arguments) = self.encode()?;
        Ok(PayloadHash::compute(&selector, &arguments))
    }

    fn decode(kind: ActionKind, selector: &Selector, arguments: &[u8]) -> GovernanceResult<Self> {
        let malformed = |e: SerializationError| GovernanceError::MalformedArguments {
            selector: *selector,
            reason: e.to_string(),
        };

        Ok(match kind {
            ActionKind::MintShares => {
                let args: MintSharesArgs = from_canonical_cbor(arguments).map_err(malformed)?;
                Action::MintShares {
                    member: args.member,
                    amount: args.amount,
                }
            }
            ActionKind::SetApprovalRequirement => {
                let args: SetApprovalRequirementArgs =
                    from_canonical_cbor(arguments).map_err(malformed)?;
                let percent = u8::try_from(args.percent)
                    .map_err(|_| GovernanceError::InvalidPercent(args.percent))?;
                Action::SetApprovalRequirement {
                    selector: args.selector,
                    percent,
                }
            }
        })
    }

    /// One-line human description.
    pub fn describe(&self) -> String {
        match self {
            Action::MintShares { member, amount } => {
                format!("mint {} shares to {}…", amount, member.short())
            }
            Action::SetApprovalRequirement { selector, percent } => {
                format!("set approval requirement of {} to {}%", selector, percent)
            }
        }
    }
}

/// Selector -> executable action kind, fixed at genesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchTable {
    handlers: BTreeMap<Selector, ActionKind>,
}

impl DispatchTable {
    /// The table every engine is built with.
    pub fn genesis() -> Self {
        Self {
            handlers: ActionKind::ALL
                .into_iter()
                .map(|kind| (kind.selector(), kind))
                .collect(),
        }
    }

    pub fn contains(&self, selector: &Selector) -> bool {
        self.handlers.contains_key(selector)
    }

    pub fn resolve(&self, selector: &Selector) -> GovernanceResult<ActionKind> {
        self.handlers
            .get(selector)
            .copied()
            .ok_or(GovernanceError::UnknownSelector(*selector))
    }

    /// Resolve, decode and validate a payload.
    ///
    /// Everything that could make execution fail for reasons other than
    /// ledger arithmetic is rejected here, before any state is touched.
    /// Arguments must be exactly [`Action::encode_arguments`] of the decoded
    /// action, so one action has one payload hash.
    pub fn decode(&self, selector: &Selector, arguments: &[u8]) -> GovernanceResult<Action> {
        let kind = self.resolve(selector)?;
        let action = Action::decode(kind, selector, arguments)?;
        self.validate(&action)?;
        Ok(action)
    }

    /// Argument checks shared by decoded and locally built actions.
    pub fn validate(&self, action: &Action) -> GovernanceResult<()> {
        match action {
            Action::MintShares { amount, .. } => {
                if *amount == 0 {
                    return Err(GovernanceError::InvalidAmount);
                }
            }
            Action::SetApprovalRequirement { selector, percent } => {
                RequirementRegistry::check_percent(*percent)?;
                // The registry never holds a selector nothing can execute.
                self.resolve(selector)?;
            }
        }
        Ok(())
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::genesis()
    }
}
