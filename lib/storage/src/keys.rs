//! Fixed storage keys used by the client.

/// Persisted auth session (access and refresh tokens, principal).
pub const SESSION_TOKEN: &str = "pawtag_auth_token";

/// Selected backend environment (`local` or `remote`).
pub const BACKEND_ENVIRONMENT: &str = "backend_environment";

/// Persisted shopping cart.
pub const CART: &str = "pawtag_cart";
