//! Shared types used across the order-inventory workspace.
//!
//! - Typed identifiers for orders, users and products
//! - The authenticated [`Principal`] handed over by the identity collaborator

pub mod principal;
pub mod types;

pub use principal::{Principal, Role, RoleParseError};
pub use types::{OrderId, ProductId, UserId};
