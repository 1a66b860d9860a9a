//! Storefront client and shopping cart for pawtag.
//!
//! [`CommerceClient`] reads the product catalog of the external store and
//! places orders; catalog reads are cached for a few minutes. [`CartStore`]
//! keeps the shopping cart in client storage and recomputes its totals on
//! every change.

pub mod cart;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod query;

pub use cart::{Cart, CartItem, CartStore, CartVariation};
pub use client::CommerceClient;
pub use config::CommerceConfig;
pub use error::CommerceError;
pub use models::{
    Address, Category, Image, LineItem, NewLineItem, NewOrder, Order, Product, Variation,
    VariationAttribute,
};
pub use query::ProductQuery;
