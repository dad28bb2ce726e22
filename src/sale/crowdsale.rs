//! Crowdsale engine
//!
//! A fixed-price, whitelist-gated sale of a single asset. The sale holds
//! inventory on an [`AssetLedger`] under its own address and collects native
//! coin proceeds in the same account until the operator finalizes.
//!
//! Every operation validates completely before touching a ledger, performs
//! the ledger transfer last, and only then updates its own counters. A
//! rejected call leaves the sale exactly as it was.

use crate::core::context::CallContext;
use crate::core::native::{NativeError, NativeLedger, NativeTransferEvent};
use crate::sale::math::{self, MAX_PURCHASE, MIN_PURCHASE};
use crate::token::{AssetLedger, TokenError, TransferEvent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Sale errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SaleError {
    #[error("Unauthorized: {caller} is not the sale operator")]
    Unauthorized { caller: String },
    #[error("Not whitelisted: {0}")]
    NotWhitelisted(String),
    #[error("Sale not open: opens at {opens_at}, now {now}")]
    SaleNotOpen {
        opens_at: DateTime<Utc>,
        now: DateTime<Utc>,
    },
    #[error(
        "Purchase out of bounds: {quantity} not within {}..={}",
        MIN_PURCHASE,
        MAX_PURCHASE
    )]
    OutOfBounds { quantity: u128 },
    #[error(
        "Payment mismatch: expected {}, received {received}",
        .expected.map_or_else(|| "overflow".to_string(), |c| c.to_string())
    )]
    PaymentMismatch {
        expected: Option<u128>,
        received: u128,
    },
    #[error("Insufficient inventory: available {available}, requested {requested}")]
    InsufficientInventory { available: u128, requested: u128 },
    #[error("Invalid price: must be greater than 0")]
    InvalidPrice,
    #[error("Sale already finalized")]
    Finalized,
    #[error("Wrong asset ledger: sale sells {expected}, got {actual}")]
    WrongAsset { expected: String, actual: String },
    #[error("Asset ledger error: {0}")]
    Ledger(#[from] TokenError),
    #[error("Payment ledger error: {0}")]
    Payment(#[from] NativeError),
}

/// Emitted for every successful purchase
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuyEvent {
    pub sale: String,
    pub quantity: u128,
    pub buyer: String,
}

/// Emitted once, when the operator closes the sale
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FinalizeEvent {
    pub sale: String,
    pub tokens_sold: u128,
    pub payment_collected: u128,
}

/// Result of a successful purchase
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Purchase {
    /// Inventory movement on the asset ledger
    pub transfer: TransferEvent,
    pub event: BuyEvent,
}

/// Result of a successful finalization
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settlement {
    /// Unsold inventory returned to the operator, if any remained
    pub asset_transfer: Option<TransferEvent>,
    /// Proceeds swept to the operator, if any were collected
    pub payment_transfer: Option<NativeTransferEvent>,
    pub event: FinalizeEvent,
}

/// A single fixed-price token sale
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Crowdsale {
    /// The sale's own account on both ledgers
    address: String,
    /// Address of the asset ledger being sold
    token: String,
    /// Deployer, the only account allowed to administer the sale
    operator: String,
    /// Payment base units per whole asset unit
    price: u128,
    /// Inventory the sale was deployed for (informational)
    max_tokens: u128,
    sale_open_at: DateTime<Utc>,
    whitelist: BTreeSet<String>,
    tokens_sold: u128,
    finalized: bool,
    deployed_at_height: u64,
}

impl Crowdsale {
    /// Create a sale operated by `operator`
    pub fn new(
        address: String,
        token: String,
        operator: String,
        price: u128,
        max_tokens: u128,
        sale_open_at: DateTime<Utc>,
        height: u64,
    ) -> Result<Self, SaleError> {
        if price == 0 {
            return Err(SaleError::InvalidPrice);
        }

        Ok(Self {
            address,
            token,
            operator,
            price,
            max_tokens,
            sale_open_at,
            whitelist: BTreeSet::new(),
            tokens_sold: 0,
            finalized: false,
            deployed_at_height: height,
        })
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Address of the asset ledger this sale sells from
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn operator(&self) -> &str {
        &self.operator
    }

    pub fn price(&self) -> u128 {
        self.price
    }

    pub fn max_tokens(&self) -> u128 {
        self.max_tokens
    }

    pub fn sale_open_at(&self) -> DateTime<Utc> {
        self.sale_open_at
    }

    pub fn tokens_sold(&self) -> u128 {
        self.tokens_sold
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn deployed_at_height(&self) -> u64 {
        self.deployed_at_height
    }

    pub fn is_whitelisted(&self, account: &str) -> bool {
        self.whitelist.contains(account)
    }

    /// Whitelisted accounts in address order
    pub fn whitelist(&self) -> impl Iterator<Item = &String> {
        self.whitelist.iter()
    }

    /// Whether purchases are accepted at `now`
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        !self.finalized && now >= self.sale_open_at
    }

    /// Exact payment required for `quantity` at the current price
    pub fn cost_of(&self, quantity: u128) -> Option<u128> {
        math::cost_of(quantity, self.price)
    }

    // =========================================================================
    // Purchases
    // =========================================================================

    /// Buy `quantity` base units, paying `ctx.value`
    ///
    /// The host has already credited `ctx.value` to the sale's account; on
    /// success it stays there as proceeds.
    pub fn buy<L: AssetLedger + ?Sized>(
        &mut self,
        ctx: &CallContext,
        quantity: u128,
        asset: &mut L,
    ) -> Result<Purchase, SaleError> {
        self.execute_purchase(ctx, quantity, asset)
    }

    /// Handle a bare payment sent to the sale's address
    ///
    /// Buys as many whole units as the payment covers and then goes through
    /// the same checks as [`Crowdsale::buy`], so a payment that is not an
    /// exact multiple of the price is rejected.
    pub fn receive<L: AssetLedger + ?Sized>(
        &mut self,
        ctx: &CallContext,
        asset: &mut L,
    ) -> Result<Purchase, SaleError> {
        // An unrepresentable quantity saturates and fails the bounds check
        let quantity = math::quantity_for_payment(ctx.value, self.price).unwrap_or(u128::MAX);
        self.execute_purchase(ctx, quantity, asset)
    }

    fn execute_purchase<L: AssetLedger + ?Sized>(
        &mut self,
        ctx: &CallContext,
        quantity: u128,
        asset: &mut L,
    ) -> Result<Purchase, SaleError> {
        self.ensure_ledger(asset)?;
        self.ensure_not_finalized()?;

        if ctx.timestamp < self.sale_open_at {
            return Err(SaleError::SaleNotOpen {
                opens_at: self.sale_open_at,
                now: ctx.timestamp,
            });
        }

        if !self.whitelist.contains(&ctx.caller) {
            return Err(SaleError::NotWhitelisted(ctx.caller.clone()));
        }

        if !math::within_purchase_bounds(quantity) {
            return Err(SaleError::OutOfBounds { quantity });
        }

        let expected = self.cost_of(quantity);
        if expected != Some(ctx.value) {
            return Err(SaleError::PaymentMismatch {
                expected,
                received: ctx.value,
            });
        }

        let available = asset.balance_of(&self.address);
        if available < quantity {
            return Err(SaleError::InsufficientInventory {
                available,
                requested: quantity,
            });
        }

        let transfer = asset.transfer(&self.address, &ctx.caller, quantity)?;

        // Bounded by the asset's fixed supply
        self.tokens_sold += quantity;

        log::info!(
            "Sale {}: {} bought {} for {}",
            self.address,
            ctx.caller,
            quantity,
            ctx.value
        );

        Ok(Purchase {
            transfer,
            event: BuyEvent {
                sale: self.address.clone(),
                quantity,
                buyer: ctx.caller.clone(),
            },
        })
    }

    // =========================================================================
    // Administration
    // =========================================================================

    /// Allow `account` to buy. Returns `false` if it was already allowed.
    pub fn add_to_whitelist(
        &mut self,
        ctx: &CallContext,
        account: &str,
    ) -> Result<bool, SaleError> {
        self.ensure_operator(ctx)?;
        self.ensure_not_finalized()?;

        let added = self.whitelist.insert(account.to_string());
        if added {
            log::debug!("Sale {}: whitelisted {}", self.address, account);
        }
        Ok(added)
    }

    /// Replace the price for all later purchases. Returns the old price.
    pub fn set_price(&mut self, ctx: &CallContext, new_price: u128) -> Result<u128, SaleError> {
        self.ensure_operator(ctx)?;
        self.ensure_not_finalized()?;

        if new_price == 0 {
            return Err(SaleError::InvalidPrice);
        }

        let old = std::mem::replace(&mut self.price, new_price);
        log::debug!(
            "Sale {}: price changed {} -> {}",
            self.address,
            old,
            new_price
        );
        Ok(old)
    }

    // =========================================================================
    // Finalization
    // =========================================================================

    /// Sweep unsold inventory and all proceeds to the operator and close the
    /// sale for good
    pub fn finalize<L: AssetLedger + ?Sized>(
        &mut self,
        ctx: &CallContext,
        asset: &mut L,
        coins: &mut NativeLedger,
    ) -> Result<Settlement, SaleError> {
        self.ensure_ledger(asset)?;
        self.ensure_operator(ctx)?;
        self.ensure_not_finalized()?;

        let remaining = asset.balance_of(&self.address);
        let collected = coins.balance_of(&self.address);

        // The asset ledger rejects zero-amount transfers
        let asset_transfer = if remaining > 0 {
            Some(asset.transfer(&self.address, &self.operator, remaining)?)
        } else {
            None
        };
        let payment_transfer = coins.transfer(&self.address, &self.operator, collected)?;

        self.finalized = true;

        log::info!(
            "Sale {} finalized: {} sold, {} collected, {} returned",
            self.address,
            self.tokens_sold,
            collected,
            remaining
        );

        Ok(Settlement {
            asset_transfer,
            payment_transfer,
            event: FinalizeEvent {
                sale: self.address.clone(),
                tokens_sold: self.tokens_sold,
                payment_collected: collected,
            },
        })
    }

    // =========================================================================
    // Guards
    // =========================================================================

    fn ensure_operator(&self, ctx: &CallContext) -> Result<(), SaleError> {
        if ctx.caller != self.operator {
            return Err(SaleError::Unauthorized {
                caller: ctx.caller.clone(),
            });
        }
        Ok(())
    }

    fn ensure_not_finalized(&self) -> Result<(), SaleError> {
        if self.finalized {
            return Err(SaleError::Finalized);
        }
        Ok(())
    }

    fn ensure_ledger<L: AssetLedger + ?Sized>(&self, asset: &L) -> Result<(), SaleError> {
        if asset.address() != self.token {
            return Err(SaleError::WrongAsset {
                expected: self.token.clone(),
                actual: asset.address().to_string(),
            });
        }
        Ok(())
    }
}
