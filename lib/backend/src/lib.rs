//! Client for the hosted auth and database service.
//!
//! [`BackendClient`] implements both backend contracts of
//! `pawtag-platform-access`:
//! - [`AuthProvider`](pawtag_platform_access::AuthProvider): password
//!   sign-in, sign-up, sign-out and token refresh, with the session
//!   persisted to client storage;
//! - [`Directory`](pawtag_platform_access::Directory): profile rows, the
//!   role procedure with its direct-query fallback, and permission checks.
//!
//! Which deployment is used (hosted or local development stack) is chosen
//! by [`Environment`] and remembered across restarts.

mod auth;
mod client;
pub mod config;
mod directory;
pub mod error;
mod wire;

#[cfg(test)]
mod testing;

pub use client::BackendClient;
pub use config::{BackendConfig, Endpoint, Environment};
pub use error::BackendError;
