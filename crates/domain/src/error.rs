//! Machine-readable error kinds shared by every layer.

use serde::{Deserialize, Serialize};

/// The category of a failed operation, reported to callers verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Missing or invalid required fields.
    ValidationError,
    /// A status string that does not normalize to a canonical status.
    InvalidStatus,
    /// A consumption adjustment could not be satisfied.
    InsufficientStock,
    /// The client-declared total disagrees with the computed one.
    TotalMismatch,
    /// The order or a referenced product does not exist.
    NotFound,
    /// The principal may not act on the resource.
    Forbidden,
    /// A concurrent write won the race for the same order.
    Conflict,
    /// Storage or other infrastructure failure.
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "ValidationError",
            ErrorKind::InvalidStatus => "InvalidStatus",
            ErrorKind::InsufficientStock => "InsufficientStock",
            ErrorKind::TotalMismatch => "TotalMismatch",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::Internal => "Internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
