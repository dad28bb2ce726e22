//! The asset-ledger capability consumed by a crowdsale
//!
//! A sale never reaches into a token's internals: it only asks for balances
//! and moves its own holdings. Anything implementing [`AssetLedger`] can back
//! a sale, and every call is expected to either apply fully or fail without
//! effect.

use crate::token::token::{Token, TokenError, TransferEvent};

/// Balance and transfer surface of a fungible-asset ledger
pub trait AssetLedger {
    /// Address identifying this ledger
    fn address(&self) -> &str;

    /// Balance held by `holder`, zero for unknown holders
    fn balance_of(&self, holder: &str) -> u128;

    /// Move `amount` from `from` to `to`
    fn transfer(&mut self, from: &str, to: &str, amount: u128)
        -> Result<TransferEvent, TokenError>;
}

impl AssetLedger for Token {
    fn address(&self) -> &str {
        &self.address
    }

    fn balance_of(&self, holder: &str) -> u128 {
        Token::balance_of(self, holder)
    }

    fn transfer(
        &mut self,
        from: &str,
        to: &str,
        amount: u128,
    ) -> Result<TransferEvent, TokenError> {
        Token::transfer(self, from, to, amount)
    }
}
