//! Core chain components
//!
//! This module contains the host the sale runs on:
//! - Native coin ledger (the payment currency)
//! - Call context (caller, attached value, execution time)
//! - Transactions and receipts
//! - Events and the event log
//! - The chain itself (serialized, atomic execution)
//! - Decimal unit conversion

pub mod chain;
pub mod context;
pub mod events;
pub mod native;
pub mod transaction;
pub mod units;

pub use chain::{Chain, ChainError, ChainStats};
pub use context::CallContext;
pub use events::{Event, LoggedEvent};
pub use native::{NativeError, NativeLedger, NativeTransferEvent, NATIVE_DECIMALS};
pub use transaction::{Call, Receipt, Transaction};
pub use units::{format_units, parse_units, UnitsError};
