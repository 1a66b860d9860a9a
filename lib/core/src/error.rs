//! Result alias shared by the pawtag crates.
//!
//! Errors at trait seams are plain per-crate enums. Operations that cross
//! several layers (HTTP clients, application wiring) return a rootcause
//! `Report` over the crate's error enum through this alias.

use rootcause::Report;

/// Result carrying a rootcause `Report` with context type `C`.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;
