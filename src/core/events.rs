//! Observable events
//!
//! Everything a listener can see: ledger movements and sale lifecycle
//! events, in global transaction order.

use crate::core::native::NativeTransferEvent;
use crate::sale::{BuyEvent, FinalizeEvent};
use crate::token::{ApprovalEvent, TransferEvent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Any event emitted while executing a transaction
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Event {
    Transfer(TransferEvent),
    Approval(ApprovalEvent),
    NativeTransfer(NativeTransferEvent),
    Buy(BuyEvent),
    Finalize(FinalizeEvent),
}

impl Event {
    /// Short event name for display and filtering
    pub fn name(&self) -> &'static str {
        match self {
            Event::Transfer(_) => "Transfer",
            Event::Approval(_) => "Approval",
            Event::NativeTransfer(_) => "NativeTransfer",
            Event::Buy(_) => "Buy",
            Event::Finalize(_) => "Finalize",
        }
    }
}

impl From<TransferEvent> for Event {
    fn from(event: TransferEvent) -> Self {
        Event::Transfer(event)
    }
}

impl From<ApprovalEvent> for Event {
    fn from(event: ApprovalEvent) -> Self {
        Event::Approval(event)
    }
}

impl From<NativeTransferEvent> for Event {
    fn from(event: NativeTransferEvent) -> Self {
        Event::NativeTransfer(event)
    }
}

impl From<BuyEvent> for Event {
    fn from(event: BuyEvent) -> Self {
        Event::Buy(event)
    }
}

impl From<FinalizeEvent> for Event {
    fn from(event: FinalizeEvent) -> Self {
        Event::Finalize(event)
    }
}

/// An event as recorded in the chain's log
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggedEvent {
    /// Height of the transaction that emitted it
    pub height: u64,
    pub tx_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: Event,
}
