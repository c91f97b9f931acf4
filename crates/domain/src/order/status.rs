//! Canonical order statuses and the normalizer that produces them.

use serde::{Deserialize, Serialize};

use super::OrderError;

/// The lifecycle status of an order.
///
/// Any status may be set to any other. Moving into or out of `Cancelled`
/// is the only transition with a stock effect:
/// ```text
/// Pending ◄──► Processing ◄──► Shipped ◄──► Delivered
///    ▲              ▲             ▲             ▲
///    └──────────────┴─────┬───────┴─────────────┘
///                         ▼
///                     Cancelled   (entering returns stock, leaving re-consumes it)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

/// Misspellings and localized synonyms accepted for canonical statuses.
const STATUS_ALIASES: &[(&str, &str)] = &[
    ("canceled", "cancelled"),
    ("cancel", "cancelled"),
    ("отменен", "cancelled"),
    ("отменён", "cancelled"),
];

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, OrderStatus::Cancelled)
    }

    /// Conventionally terminal. Not enforced: administrators may move an
    /// order out of these states.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    fn from_canonical(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == value)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize_status(s)
    }
}

/// Maps a free-form status string to a canonical status.
///
/// The input is trimmed and lower-cased, then looked up in the alias table.
/// Anything not aliased is validated as-is against the canonical set.
pub fn normalize_status(input: &str) -> Result<OrderStatus, OrderError> {
    let lowered = input.trim().to_lowercase();
    let canonical = STATUS_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lowered)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(lowered.as_str());

    OrderStatus::from_canonical(canonical).ok_or_else(|| OrderError::InvalidStatus(input.to_string()))
}

/// Net change in stock ownership caused solely by a status transition.
///
/// `+1` when entering `Cancelled` (items go back to stock), `-1` when leaving
/// it (items are consumed again), `0` otherwise.
pub fn cancellation_delta(prev: OrderStatus, next: OrderStatus) -> i64 {
    i64::from(next.is_cancelled()) - i64::from(prev.is_cancelled())
}
