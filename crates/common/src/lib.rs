//! Shared types used across the atelier ledger crates.

mod actor;
mod id;

pub use actor::{Actor, ParseRoleError, StaffRole};
pub use id::AggregateId;
