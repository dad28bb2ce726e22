//! Native coin ledger
//!
//! Balances of the payment currency. Crowdsale proceeds accumulate in the
//! sale's own account here until finalization sweeps them to the operator.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Decimal places of the native coin
pub const NATIVE_DECIMALS: u32 = 18;

/// Native ledger errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NativeError {
    #[error("Insufficient funds: have {have}, need {need}")]
    InsufficientFunds { have: u128, need: u128 },
    #[error("Balance overflow for {0}")]
    Overflow(String),
}

/// Native coin transfer event
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NativeTransferEvent {
    pub from: String,
    pub to: String,
    pub amount: u128,
}

/// Account balances of the native coin
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NativeLedger {
    balances: HashMap<String, u128>,
    /// Sum of all genesis allocations
    total_issued: u128,
}

impl NativeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance of an account, zero for unknown accounts
    pub fn balance_of(&self, account: &str) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Total coins ever allocated
    pub fn total_issued(&self) -> u128 {
        self.total_issued
    }

    /// Credit freshly issued coins to an account (genesis allocation)
    pub fn allocate(&mut self, account: &str, amount: u128) -> Result<(), NativeError> {
        let total = self
            .total_issued
            .checked_add(amount)
            .ok_or_else(|| NativeError::Overflow(account.to_string()))?;
        // Every balance is bounded by total_issued, so this cannot overflow
        *self.balances.entry(account.to_string()).or_insert(0) += amount;
        self.total_issued = total;
        Ok(())
    }

    /// Move coins between accounts
    ///
    /// A zero amount is a no-op and returns `None`.
    pub fn transfer(
        &mut self,
        from: &str,
        to: &str,
        amount: u128,
    ) -> Result<Option<NativeTransferEvent>, NativeError> {
        if amount == 0 {
            return Ok(None);
        }

        let have = self.balance_of(from);
        if have < amount {
            return Err(NativeError::InsufficientFunds { have, need: amount });
        }

        if from != to {
            *self.balances.entry(from.to_string()).or_insert(0) -= amount;
            *self.balances.entry(to.to_string()).or_insert(0) += amount;
        }

        Ok(Some(NativeTransferEvent {
            from: from.to_string(),
            to: to.to_string(),
            amount,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_and_transfer() {
        let mut ledger = NativeLedger::new();
        ledger.allocate("alice", 1_000).unwrap();

        let event = ledger.transfer("alice", "bob", 400).unwrap().unwrap();

        assert_eq!(event.amount, 400);
        assert_eq!(ledger.balance_of("alice"), 600);
        assert_eq!(ledger.balance_of("bob"), 400);
        assert_eq!(ledger.total_issued(), 1_000);
    }

    #[test]
    fn test_insufficient_funds() {
        let mut ledger = NativeLedger::new();
        ledger.allocate("alice", 10).unwrap();

        let result = ledger.transfer("alice", "bob", 11);
        assert_eq!(
            result,
            Err(NativeError::InsufficientFunds { have: 10, need: 11 })
        );
        assert_eq!(ledger.balance_of("alice"), 10);
    }

    #[test]
    fn test_zero_transfer_is_noop() {
        let mut ledger = NativeLedger::new();

        assert_eq!(ledger.transfer("nobody", "bob", 0), Ok(None));
        assert_eq!(ledger.balance_of("bob"), 0);
    }

    #[test]
    fn test_allocation_overflow() {
        let mut ledger = NativeLedger::new();
        ledger.allocate("alice", u128::MAX).unwrap();

        assert!(matches!(
            ledger.allocate("bob", 1),
            Err(NativeError::Overflow(_))
        ));
        assert_eq!(ledger.balance_of("bob"), 0);
    }
}
