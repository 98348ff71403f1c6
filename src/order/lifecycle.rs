//! Order Lifecycle
//!
//! The status state machine an order moves through, and the history
//! entries that record each move.

use std::{fmt, str::FromStr};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Progress of an order from placement to a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Newly created, awaiting fulfilment.
    Placed,

    /// Being prepared for delivery.
    Processing,

    /// Fulfilled. Terminal.
    Delivered,

    /// Called off by the shopper or an admin. Terminal.
    Cancelled,
}

impl OrderStatus {
    /// The statuses this status may move to.
    #[must_use]
    pub fn allowed_transitions(self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Placed => &[OrderStatus::Processing, OrderStatus::Cancelled],
            OrderStatus::Processing => &[OrderStatus::Delivered, OrderStatus::Cancelled],
            OrderStatus::Delivered | OrderStatus::Cancelled => &[],
        }
    }

    /// Whether this status permits a move to `next`.
    #[must_use]
    pub fn can_become(self, next: OrderStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// Whether no further transitions are permitted.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }

    /// Validate the edge from `self` to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::Illegal`] naming the current status and
    /// the statuses it may still move to.
    pub fn ensure_can_become(self, next: OrderStatus) -> Result<(), TransitionError> {
        if self.can_become(next) {
            Ok(())
        } else {
            Err(TransitionError::Illegal {
                from: self,
                to: next,
                allowed: self.allowed_transitions(),
            })
        }
    }

    /// The status name as stored and displayed.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Placed => "Placed",
            OrderStatus::Processing => "Processing",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Placed" => Ok(OrderStatus::Placed),
            "Processing" => Ok(OrderStatus::Processing),
            "Delivered" => Ok(OrderStatus::Delivered),
            "Cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// A status name that is not part of the lifecycle.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown order status {0:?}")]
pub struct ParseStatusError(String);

/// Errors related to status transitions.
#[derive(Debug, Error)]
pub enum TransitionError {
    /// The requested edge is not in the transition table.
    #[error("cannot change status from {from} to {to}; allowed next statuses: {}", fmt_allowed(.allowed))]
    Illegal {
        /// Status the order is currently in.
        from: OrderStatus,

        /// Status that was requested.
        to: OrderStatus,

        /// Statuses the order may still move to.
        allowed: &'static [OrderStatus],
    },
}

/// Comma-separated status list for transition error messages.
fn fmt_allowed(allowed: &[OrderStatus]) -> String {
    if allowed.is_empty() {
        "none".to_string()
    } else {
        allowed
            .iter()
            .map(|status| status.as_str().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// One entry in an order's status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    status: OrderStatus,
    changed_at: Timestamp,
    note: String,
}

impl StatusEntry {
    /// Create an entry, generating the default note when none is given.
    ///
    /// A blank custom note is treated as absent.
    #[must_use]
    pub fn new(status: OrderStatus, note: Option<String>, changed_at: Timestamp) -> Self {
        let note = match note {
            Some(note) if !note.trim().is_empty() => note,
            _ => format!("Status changed to {status}"),
        };

        StatusEntry {
            status,
            changed_at,
            note,
        }
    }

    /// The status the order moved to.
    #[must_use]
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// When the move happened.
    #[must_use]
    pub fn changed_at(&self) -> Timestamp {
        self.changed_at
    }

    /// Free-text annotation for the move.
    #[must_use]
    pub fn note(&self) -> &str {
        &self.note
    }
}
