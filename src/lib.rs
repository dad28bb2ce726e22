//! Crowdsale: a fixed-price, whitelist-gated token sale in Rust
//!
//! This crate provides the sale engine together with the host it runs on:
//! - ERC-20 style token ledger with allowances
//! - Native coin ledger for payments
//! - Crowdsale state machine (purchase, passive intake, whitelist, pricing,
//!   finalization) with exact fixed-point cost math
//! - Serialized, all-or-nothing transaction execution with an event log
//! - JSON persistence with backups
//! - Deployment from a JSON config
//!
//! # Example
//!
//! ```rust
//! use chrono::{Duration, Utc};
//! use crowdsale::core::{Call, Chain, Transaction};
//! use crowdsale::deploy::{deploy_sale, DeployConfig};
//! use crowdsale::sale::SCALE;
//!
//! let mut chain = Chain::new();
//! let now = Utc::now();
//! let deployment = deploy_sale(&mut chain, "deployer", &DeployConfig::default(), now).unwrap();
//!
//! chain.allocate("alice", 100 * SCALE).unwrap();
//! chain
//!     .submit(Transaction::new(
//!         "deployer",
//!         Call::AddToWhitelist {
//!             sale: deployment.sale.clone(),
//!             account: "alice".to_string(),
//!         },
//!         now,
//!     ))
//!     .unwrap();
//!
//! // 10 tokens at 0.025 coins each
//! let receipt = chain
//!     .submit(
//!         Transaction::new(
//!             "alice",
//!             Call::Buy {
//!                 sale: deployment.sale.clone(),
//!                 quantity: 10 * SCALE,
//!             },
//!             now + Duration::seconds(60),
//!         )
//!         .with_value(SCALE / 4),
//!     )
//!     .unwrap();
//!
//! assert_eq!(receipt.events_named("Buy").count(), 1);
//! assert_eq!(chain.token_balance(&deployment.token, "alice").unwrap(), 10 * SCALE);
//! ```

pub mod cli;
pub mod core;
pub mod crypto;
pub mod deploy;
pub mod sale;
pub mod storage;
pub mod token;

// Re-export commonly used types
pub use core::{CallContext, Chain, ChainError, Event, NativeLedger, Receipt, Transaction};
pub use deploy::{deploy_sale, DeployConfig, Deployment};
pub use sale::{Crowdsale, SaleError, SaleManager};
pub use storage::{Storage, StorageConfig};
pub use token::{AssetLedger, Token, TokenManager, TokenMetadata};
