//! Execution context handed to a sale call

use chrono::{DateTime, Utc};

/// Who is calling, what they attached and when the call executes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    /// Address that submitted the transaction
    pub caller: String,
    /// Native coins attached to the call, already credited to the callee
    pub value: u128,
    /// Timestamp of the executing transaction
    pub timestamp: DateTime<Utc>,
}

impl CallContext {
    /// A call with no attached value
    pub fn new(caller: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            caller: caller.into(),
            value: 0,
            timestamp,
        }
    }

    /// Attach native coins to the call
    pub fn with_value(mut self, value: u128) -> Self {
        self.value = value;
        self
    }
}
