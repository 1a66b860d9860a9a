//! Application wiring for the pawtag client.
//!
//! Composes the library configs into [`AppConfig`], installs logging and
//! assembles one [`App`] owning the backend client, the authorization
//! manager, the storefront client and the cart.

pub mod app;
pub mod config;
pub mod error;
pub mod telemetry;

pub use app::App;
pub use config::AppConfig;
pub use error::AppError;
