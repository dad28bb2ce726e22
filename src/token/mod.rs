//! ERC-20 style fungible token implementation
//!
//! The asset ledger a crowdsale sells from:
//! - Balances per address
//! - Allowances for delegated transfers
//! - The [`AssetLedger`] capability the sale engine consumes
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use crowdsale::token::TokenManager;
//!
//! let mut manager = TokenManager::new();
//!
//! let token = manager
//!     .create_token(
//!         "Henry token".to_string(),
//!         "HENRY".to_string(),
//!         18,
//!         1_000_000,
//!         "creator_address",
//!         1,
//!         Utc::now(),
//!     )
//!     .unwrap();
//!
//! manager.transfer(&token.address, "creator_address", "recipient", 1000).unwrap();
//! assert_eq!(manager.balance_of(&token.address, "recipient").unwrap(), 1000);
//! ```

pub mod ledger;
pub mod manager;
pub mod token;

pub use ledger::AssetLedger;
pub use manager::TokenManager;
pub use token::{ApprovalEvent, Token, TokenError, TokenMetadata, TransferEvent};
