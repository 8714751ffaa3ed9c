//! Share ledger.
//!
//! Tracks each member's voting weight and the total in circulation. Shares
//! are only ever minted; nothing in this crate transfers or burns them, so
//! `total_shares == sum(shares_of(m))` holds at every observation point.

use super::error::{GovernanceError, GovernanceResult};
use super::types::{MemberId, Shares};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A member and its voting weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub shares: Shares,
}

/// Member balances and total weight.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    balances: BTreeMap<MemberId, Shares>,
    total_shares: Shares,
}

impl Ledger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total shares in circulation.
    pub fn total_shares(&self) -> Shares {
        self.total_shares
    }

    /// Shares held by `member` (0 if unknown).
    pub fn shares_of(&self, member: &MemberId) -> Shares {
        self.balances.get(member).copied().unwrap_or(0)
    }

    /// Member record, if the member has ever been minted shares.
    pub fn member(&self, member: &MemberId) -> Option<Member> {
        self.balances.get(member).map(|&shares| Member {
            id: *member,
            shares,
        })
    }

    /// All members in id order.
    pub fn members(&self) -> impl Iterator<Item = Member> + '_ {
        self.balances
            .iter()
            .map(|(&id, &shares)| Member { id, shares })
    }

    /// Validate a mint without applying it.
    ///
    /// Returns the new (member, total) balances.
    pub fn check_mint(&self, member: &MemberId, amount: Shares) -> GovernanceResult<(Shares, Shares)> {
        if amount == 0 {
            return Err(GovernanceError::InvalidAmount);
        }
        let balance = self
            .shares_of(member)
            .checked_add(amount)
            .ok_or(GovernanceError::Overflow)?;
        let total = self
            .total_shares
            .checked_add(amount)
            .ok_or(GovernanceError::Overflow)?;
        Ok((balance, total))
    }

    /// Mint `amount` shares to `member`.
    ///
    /// Both additions are checked before either is written.
    pub(crate) fn mint(&mut self, member: &MemberId, amount: Shares) -> GovernanceResult<()> {
        let (balance, total) = self.check_mint(member, amount)?;
        self.balances.insert(*member, balance);
        self.total_shares = total;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(byte: u8) -> MemberId {
        MemberId::from_bytes([byte; 32])
    }

    #[test]
    fn test_unknown_member_has_zero_shares() {
        let ledger = Ledger::new();
        assert_eq!(ledger.shares_of(&member(1)), 0);
        assert_eq!(ledger.member(&member(1)), None);
        assert_eq!(ledger.total_shares(), 0);
    }

    #[test]
    fn test_mint_updates_member_and_total() {
        let mut ledger = Ledger::new();
        ledger.mint(&member(1), 51).unwrap();
        ledger.mint(&member(2), 49).unwrap();
        ledger.mint(&member(2), 10).unwrap();

        assert_eq!(ledger.shares_of(&member(1)), 51);
        assert_eq!(ledger.shares_of(&member(2)), 59);
        assert_eq!(ledger.total_shares(), 110);
        assert_eq!(ledger.members().count(), 2);
    }

    #[test]
    fn test_mint_zero_rejected() {
        let mut ledger = Ledger::new();
        assert_eq!(
            ledger.mint(&member(1), 0),
            Err(GovernanceError::InvalidAmount)
        );
        assert_eq!(ledger, Ledger::new());
    }

    #[test]
    fn test_mint_overflow_leaves_ledger_untouched() {
        let mut ledger = Ledger::new();
        ledger.mint(&member(1), u64::MAX - 1).unwrap();
        let before = ledger.clone();

        // Member 2 alone would fit, but the total would not.
        assert_eq!(ledger.mint(&member(2), 2), Err(GovernanceError::Overflow));
        assert_eq!(ledger, before);
    }
}
