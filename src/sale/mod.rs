//! Crowdsale module
//!
//! A fixed-price, whitelist-gated token sale.
//!
//! # Overview
//!
//! - [`Crowdsale`]: the sale state machine (purchase, passive intake,
//!   administration, finalization)
//! - [`math`]: fixed-point cost arithmetic and per-purchase bounds
//! - [`SaleManager`]: deployment at deterministic addresses
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use crowdsale::core::{CallContext, NativeLedger};
//! use crowdsale::sale::{Crowdsale, SCALE};
//! use crowdsale::token::{Token, TokenMetadata};
//!
//! let now = Utc::now();
//! let metadata = TokenMetadata::new(
//!     "Henry token".to_string(),
//!     "HENRY".to_string(),
//!     18,
//!     1_000 * SCALE,
//!     "deployer".to_string(),
//!     0,
//!     now,
//! )
//! .unwrap();
//! let mut token = Token::new("0xTOKEN".to_string(), metadata);
//! let mut sale = Crowdsale::new(
//!     "0xSALE".to_string(),
//!     token.address.clone(),
//!     "deployer".to_string(),
//!     SCALE,
//!     1_000 * SCALE,
//!     now,
//!     1,
//! )
//! .unwrap();
//!
//! token.transfer("deployer", "0xSALE", 1_000 * SCALE).unwrap();
//! sale.add_to_whitelist(&CallContext::new("deployer", now), "alice").unwrap();
//!
//! let ctx = CallContext::new("alice", now).with_value(10 * SCALE);
//! let purchase = sale.buy(&ctx, 10 * SCALE, &mut token).unwrap();
//! assert_eq!(purchase.event.quantity, 10 * SCALE);
//!
//! let mut coins = NativeLedger::new();
//! let settlement = sale
//!     .finalize(&CallContext::new("deployer", now), &mut token, &mut coins)
//!     .unwrap();
//! assert_eq!(settlement.event.tokens_sold, 10 * SCALE);
//! ```

pub mod crowdsale;
pub mod manager;
pub mod math;

pub use crowdsale::{BuyEvent, Crowdsale, FinalizeEvent, Purchase, SaleError, Settlement};
pub use manager::SaleManager;
pub use math::{MAX_PURCHASE, MIN_PURCHASE, SCALE, TOKEN_DECIMALS};
