//! Token manager for deploying and resolving tokens
//!
//! Handles token deployment and provides address-based operations.

use crate::crypto::derive_address;
use crate::token::token::{ApprovalEvent, Token, TokenError, TokenMetadata, TransferEvent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Manages all tokens deployed on the chain
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TokenManager {
    /// All tokens by address
    tokens: HashMap<String, Token>,
    /// Deployment counter for address generation
    nonce: u64,
}

impl TokenManager {
    /// Create a new token manager
    pub fn new() -> Self {
        Self {
            tokens: HashMap::new(),
            nonce: 0,
        }
    }

    /// Create a new token
    ///
    /// The whole supply is allocated to the creator.
    #[allow(clippy::too_many_arguments)]
    pub fn create_token(
        &mut self,
        name: String,
        symbol: String,
        decimals: u8,
        total_supply: u128,
        creator: &str,
        height: u64,
        created_at: DateTime<Utc>,
    ) -> Result<Token, TokenError> {
        let metadata = TokenMetadata::new(
            name,
            symbol,
            decimals,
            total_supply,
            creator.to_string(),
            height,
            created_at,
        )?;

        let address = derive_address(&format!(
            "token:{}:{}:{}",
            creator, metadata.symbol, self.nonce
        ));

        if self.tokens.contains_key(&address) {
            return Err(TokenError::TokenAlreadyExists(address));
        }
        self.nonce += 1;

        let token = Token::new(address.clone(), metadata);
        self.tokens.insert(address.clone(), token.clone());

        log::info!(
            "Token created: {} ({}) at {}",
            token.name(),
            token.symbol(),
            address
        );

        Ok(token)
    }

    /// Get a token by address
    pub fn get(&self, address: &str) -> Option<&Token> {
        self.tokens.get(address)
    }

    /// Get mutable reference to a token
    pub fn get_mut(&mut self, address: &str) -> Option<&mut Token> {
        self.tokens.get_mut(address)
    }

    /// Resolve a token or fail with `TokenNotFound`
    pub fn resolve_mut(&mut self, address: &str) -> Result<&mut Token, TokenError> {
        self.tokens
            .get_mut(address)
            .ok_or_else(|| TokenError::TokenNotFound(address.to_string()))
    }

    fn resolve(&self, address: &str) -> Result<&Token, TokenError> {
        self.tokens
            .get(address)
            .ok_or_else(|| TokenError::TokenNotFound(address.to_string()))
    }

    /// List all tokens
    pub fn list(&self) -> Vec<&Token> {
        self.tokens.values().collect()
    }

    /// Get token count
    pub fn count(&self) -> usize {
        self.tokens.len()
    }

    /// Check if a token exists
    pub fn exists(&self, address: &str) -> bool {
        self.tokens.contains_key(address)
    }

    /// Transfer tokens
    pub fn transfer(
        &mut self,
        token_address: &str,
        from: &str,
        to: &str,
        amount: u128,
    ) -> Result<TransferEvent, TokenError> {
        self.resolve_mut(token_address)?.transfer(from, to, amount)
    }

    /// Approve spender
    pub fn approve(
        &mut self,
        token_address: &str,
        owner: &str,
        spender: &str,
        amount: u128,
    ) -> Result<ApprovalEvent, TokenError> {
        self.resolve_mut(token_address)?
            .approve(owner, spender, amount)
    }

    /// Transfer from (delegated transfer)
    pub fn transfer_from(
        &mut self,
        token_address: &str,
        spender: &str,
        from: &str,
        to: &str,
        amount: u128,
    ) -> Result<TransferEvent, TokenError> {
        self.resolve_mut(token_address)?
            .transfer_from(spender, from, to, amount)
    }

    /// Get balance for an address in a specific token
    pub fn balance_of(&self, token_address: &str, holder: &str) -> Result<u128, TokenError> {
        Ok(self.resolve(token_address)?.balance_of(holder))
    }

    /// Get allowance
    pub fn allowance(
        &self,
        token_address: &str,
        owner: &str,
        spender: &str,
    ) -> Result<u128, TokenError> {
        Ok(self.resolve(token_address)?.allowance(owner, spender))
    }

    /// Get all tokens held by an address
    pub fn tokens_for_holder(&self, holder: &str) -> Vec<(&Token, u128)> {
        self.tokens
            .values()
            .filter_map(|token| {
                let balance = token.balance_of(holder);
                (balance > 0).then_some((token, balance))
            })
            .collect()
    }
}
