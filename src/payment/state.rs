use serde::{Deserialize, Serialize};

/// Lifecycle of a payment. `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Succeeded,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }

    /// Whether this status may move to `next`. Only `Pending` moves;
    /// terminal states never change.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        matches!(self, PaymentStatus::Pending) && next.is_terminal()
    }
}

/// Result of applying a provider-reported transition to a stored payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The payment moved from pending to the new terminal state.
    Applied,
    /// The payment is already in exactly this terminal state. Safe to
    /// acknowledge; no event is re-published.
    AlreadyApplied,
    /// No payment matches the (order, provider reference) pair.
    NotFound,
    /// The payment is in a different terminal state; the transition is
    /// refused.
    Rejected,
}
