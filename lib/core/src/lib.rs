//! Core types and utilities for the pawtag client.
//!
//! This crate provides the foundational identifiers, the injectable clock,
//! the TTL cache and the error handling alias shared by every other crate.

pub mod cache;
pub mod clock;
pub mod error;
pub mod id;

pub use cache::TtlCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::Result;
pub use id::{BranchId, CartItemKey, CompanyId, ParseIdError, PrincipalId, ProfileId};
