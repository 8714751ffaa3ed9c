//! Proposal ledger.
//!
//! One record per payload hash: who has endorsed it and the combined weight
//! they brought. A record is created by the first endorsement, grows with
//! each distinct endorser, and is removed on execution or once expired.
//! An expired record is treated as absent; its weight never carries over.

use super::action::Action;
use super::error::{GovernanceError, GovernanceResult};
use super::types::{MemberId, PayloadHash, Shares};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Endorsement record for one payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Decoded action the payload invokes.
    pub action: Action,

    /// Sum of endorsers' shares at the time each endorsed.
    pub endorsing_weight: Shares,

    /// Members who have endorsed (prevents double counting).
    pub endorsers: BTreeSet<MemberId>,

    /// Creation timestamp (first endorsement).
    pub created_at: u64,

    /// Expiration timestamp; `None` never expires.
    #[serde(default)]
    pub expires_at: Option<u64>,
}

impl Proposal {
    fn open(action: Action, now: u64, duration_secs: u64) -> Self {
        let expires_at = match duration_secs {
            0 => None,
            // Saturating past u64::MAX is indistinguishable from never.
            d => now.checked_add(d),
        };
        Self {
            action,
            endorsing_weight: 0,
            endorsers: BTreeSet::new(),
            created_at: now,
            expires_at,
        }
    }

    /// Whether the proposal is expired at `now` (`now >= expires_at`).
    pub fn is_expired(&self, now: u64) -> bool {
        matches!(self.expires_at, Some(expires_at) if now >= expires_at)
    }

    pub fn has_endorsed(&self, member: &MemberId) -> bool {
        self.endorsers.contains(member)
    }
}

/// Outcome of recording an endorsement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endorsement {
    /// Endorsing weight after the endorsement.
    pub endorsing_weight: Shares,
    /// False when the member had already endorsed (no weight added).
    pub is_new_endorser: bool,
}

/// Live proposals keyed by payload hash.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalLedger {
    /// Lifetime of new proposals in seconds; 0 means never expires.
    duration_secs: u64,
    proposals: BTreeMap<PayloadHash, Proposal>,
}

impl ProposalLedger {
    pub fn new(duration_secs: u64) -> Self {
        Self {
            duration_secs,
            proposals: BTreeMap::new(),
        }
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    /// Stored record, even if expired.
    pub fn get(&self, payload: &PayloadHash) -> Option<&Proposal> {
        self.proposals.get(payload)
    }

    /// Stored record unless expired at `now`.
    pub fn live(&self, payload: &PayloadHash, now: u64) -> Option<&Proposal> {
        self.proposals.get(payload).filter(|p| !p.is_expired(now))
    }

    /// Whether a stored record for `payload` is expired. Absent is not expired.
    pub fn is_expired(&self, payload: &PayloadHash, now: u64) -> bool {
        self.proposals
            .get(payload)
            .is_some_and(|p| p.is_expired(now))
    }

    /// Non-expired proposals in payload-hash order.
    pub fn iter_live(&self, now: u64) -> impl Iterator<Item = (&PayloadHash, &Proposal)> + '_ {
        self.proposals.iter().filter(move |(_, p)| !p.is_expired(now))
    }

    /// Number of stored records, expired ones included.
    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }

    /// Compute what [`record_endorsement`](Self::record_endorsement) would
    /// return, without writing anything.
    pub fn preview_endorsement(
        &self,
        payload: &PayloadHash,
        member: &MemberId,
        weight: Shares,
        now: u64,
    ) -> GovernanceResult<Endorsement> {
        match self.live(payload, now) {
            Some(p) if p.has_endorsed(member) => Ok(Endorsement {
                endorsing_weight: p.endorsing_weight,
                is_new_endorser: false,
            }),
            existing => {
                let current = existing.map_or(0, |p| p.endorsing_weight);
                let endorsing_weight = current
                    .checked_add(weight)
                    .ok_or(GovernanceError::Overflow)?;
                Ok(Endorsement {
                    endorsing_weight,
                    is_new_endorser: true,
                })
            }
        }
    }

    /// Record `member`'s endorsement of `payload` with `weight`.
    ///
    /// Idempotent per member: a repeat endorsement returns the unchanged
    /// weight with `is_new_endorser == false`. An expired record is replaced
    /// by a fresh one starting from zero.
    pub(crate) fn record_endorsement(
        &mut self,
        payload: PayloadHash,
        action: &Action,
        member: MemberId,
        weight: Shares,
        now: u64,
    ) -> GovernanceResult<Endorsement> {
        let endorsement = self.preview_endorsement(&payload, &member, weight, now)?;
        if !endorsement.is_new_endorser {
            return Ok(endorsement);
        }

        self.prune_if_expired(&payload, now);
        let duration_secs = self.duration_secs;
        let proposal = self
            .proposals
            .entry(payload)
            .or_insert_with(|| Proposal::open(action.clone(), now, duration_secs));
        proposal.endorsing_weight = endorsement.endorsing_weight;
        proposal.endorsers.insert(member);
        Ok(endorsement)
    }

    /// Remove the record for `payload`.
    pub(crate) fn purge(&mut self, payload: &PayloadHash) -> Option<Proposal> {
        self.proposals.remove(payload)
    }

    /// Remove the record for `payload` if it is expired at `now`.
    pub(crate) fn prune_if_expired(&mut self, payload: &PayloadHash, now: u64) -> bool {
        if self.is_expired(payload, now) {
            self.proposals.remove(payload);
            true
        } else {
            false
        }
    }

    /// Remove every record expired at `now`; returns how many were removed.
    pub(crate) fn prune_expired(&mut self, now: u64) -> usize {
        let before = self.proposals.len();
        self.proposals.retain(|_, p| !p.is_expired(now));
        before - self.proposals.len()
    }
}
