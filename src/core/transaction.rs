//! Transactions submitted to the chain
//!
//! A transaction names its sender, the native coins it carries, the time it
//! executes at, and a single call. The id is a hash of all of these.

use crate::core::events::Event;
use crate::crypto::sha256_hex;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Calls
// =============================================================================

/// Operations a transaction can carry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Call {
    /// Deploy a new token - the whole supply goes to the sender
    DeployToken {
        name: String,
        symbol: String,
        decimals: u8,
        total_supply: u128,
    },
    /// Transfer tokens from sender to recipient
    TransferToken {
        token: String,
        to: String,
        amount: u128,
    },
    /// Approve spender to transfer the sender's tokens
    ApproveToken {
        token: String,
        spender: String,
        amount: u128,
    },
    /// Transfer tokens on behalf of `from` (sender spends the allowance)
    TransferTokenFrom {
        token: String,
        from: String,
        to: String,
        amount: u128,
    },
    /// Deploy a crowdsale operated by the sender
    DeployCrowdsale {
        token: String,
        price: u128,
        max_tokens: u128,
        sale_open_at: DateTime<Utc>,
    },
    /// Buy from a sale, paying the attached value
    Buy { sale: String, quantity: u128 },
    /// Send the attached value; a sale recipient treats it as a purchase
    Send { to: String },
    AddToWhitelist { sale: String, account: String },
    SetPrice { sale: String, price: u128 },
    Finalize { sale: String },
}

impl Call {
    /// Account credited with the transaction's value, `None` for calls that
    /// cannot carry value
    pub fn payee(&self) -> Option<&str> {
        match self {
            Call::Buy { sale, .. } => Some(sale.as_str()),
            Call::Send { to } => Some(to.as_str()),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Call::DeployToken { .. } => "deploy_token",
            Call::TransferToken { .. } => "transfer_token",
            Call::ApproveToken { .. } => "approve_token",
            Call::TransferTokenFrom { .. } => "transfer_token_from",
            Call::DeployCrowdsale { .. } => "deploy_crowdsale",
            Call::Buy { .. } => "buy",
            Call::Send { .. } => "send",
            Call::AddToWhitelist { .. } => "add_to_whitelist",
            Call::SetPrice { .. } => "set_price",
            Call::Finalize { .. } => "finalize",
        }
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// A signed-off unit of work for the chain
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    /// Hash of the transaction contents
    pub id: String,
    pub sender: String,
    /// Native coins attached, moved to the call's payee before execution
    pub value: u128,
    pub timestamp: DateTime<Utc>,
    pub call: Call,
}

impl Transaction {
    /// Create a transaction carrying no value
    pub fn new(sender: impl Into<String>, call: Call, timestamp: DateTime<Utc>) -> Self {
        let mut tx = Self {
            id: String::new(),
            sender: sender.into(),
            value: 0,
            timestamp,
            call,
        };
        tx.id = tx.calculate_hash();
        tx
    }

    /// Attach native coins
    pub fn with_value(mut self, value: u128) -> Self {
        self.value = value;
        self.id = self.calculate_hash();
        self
    }

    /// Calculate the transaction hash
    pub fn calculate_hash(&self) -> String {
        let data = format!(
            "{}{}{}{:?}",
            self.sender,
            self.value,
            self.timestamp.to_rfc3339(),
            self.call
        );
        sha256_hex(data.as_bytes())
    }
}

// =============================================================================
// Receipt
// =============================================================================

/// Outcome of a committed transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Receipt {
    pub tx_id: String,
    /// Height assigned to the transaction
    pub height: u64,
    /// Address of the token or sale a deployment created
    pub created: Option<String>,
    /// Events in emission order
    pub events: Vec<Event>,
}

impl Receipt {
    /// Events with the given name
    pub fn events_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Event> + 'a {
        self.events.iter().filter(move |e| e.name() == name)
    }
}
