//! Catalog and order records of the storefront API.
//!
//! Only the fields the client reads are modeled; unknown fields are
//! ignored. Prices arrive as decimal strings.

use serde::{Deserialize, Serialize};

/// An image attached to a product, category or variation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Image {
    #[serde(default)]
    pub id: u64,
    pub src: String,
    #[serde(default)]
    pub alt: String,
}

/// Category reference embedded in a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: u64,
    pub name: String,
    pub slug: String,
}

/// A product attribute and its possible options.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProductAttribute {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub variation: bool,
    #[serde(default)]
    pub options: Vec<String>,
}

/// A product of the catalog.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
    pub id: u64,
    pub name: String,
    pub slug: String,
    pub permalink: String,
    pub status: String,
    pub featured: bool,
    pub description: String,
    pub short_description: String,
    pub sku: String,
    pub price: String,
    pub regular_price: String,
    pub sale_price: String,
    pub on_sale: bool,
    pub stock_status: String,
    pub images: Vec<Image>,
    pub categories: Vec<CategoryRef>,
    pub attributes: Vec<ProductAttribute>,
    pub variations: Vec<u64>,
}

impl Product {
    /// Current price as a number. An empty or malformed price is zero.
    #[must_use]
    pub fn unit_price(&self) -> f64 {
        parse_price(&self.price)
    }

    #[must_use]
    pub fn is_in_stock(&self) -> bool {
        self.stock_status == "instock"
    }

    #[must_use]
    pub fn has_variations(&self) -> bool {
        !self.variations.is_empty()
    }
}

pub(crate) fn parse_price(raw: &str) -> f64 {
    raw.trim().parse().unwrap_or(0.0)
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Category {
    pub id: u64,
    pub name: String,
    pub slug: String,
    pub parent: u64,
    pub description: String,
    pub count: u64,
    pub image: Option<Image>,
}

/// One chosen option of a variation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariationAttribute {
    pub name: String,
    pub option: String,
}

/// A purchasable variant of a variable product.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Variation {
    pub id: u64,
    pub sku: String,
    pub price: String,
    pub regular_price: String,
    pub sale_price: String,
    pub stock_status: String,
    pub image: Option<Image>,
    pub attributes: Vec<VariationAttribute>,
}

/// Billing or shipping address of an order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub address_1: String,
    pub address_2: String,
    pub city: String,
    pub state: String,
    pub postcode: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// A line of a placed order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LineItem {
    pub id: u64,
    pub name: String,
    pub product_id: u64,
    pub variation_id: u64,
    pub quantity: u32,
    pub subtotal: String,
    pub total: String,
    pub price: f64,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Order {
    pub id: u64,
    pub number: String,
    pub status: String,
    pub currency: String,
    pub date_created: Option<String>,
    pub total: String,
    pub shipping_total: String,
    pub total_tax: String,
    pub customer_id: u64,
    pub customer_note: String,
    pub payment_method: String,
    pub payment_method_title: String,
    pub billing: Address,
    pub shipping: Address,
    pub line_items: Vec<LineItem>,
}

/// A line of an order to be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewLineItem {
    pub product_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variation_id: Option<u64>,
    pub quantity: u32,
}

/// Body of the order creation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewOrder {
    pub payment_method: String,
    pub payment_method_title: String,
    pub set_paid: bool,
    pub billing: Address,
    pub shipping: Address,
    pub line_items: Vec<NewLineItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_note: Option<String>,
}
