//! Shopping cart persisted to client storage.

use crate::models::{Address, NewLineItem, NewOrder, Product, VariationAttribute};
use pawtag_core::CartItemKey;
use pawtag_storage::{ClientStorage, get_json, keys, set_json};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::{debug, warn};

/// The chosen variation of a cart line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartVariation {
    pub variation_id: u64,
    pub attributes: Vec<VariationAttribute>,
}

/// One line of the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub key: CartItemKey,
    pub product_id: u64,
    pub name: String,
    pub price: f64,
    pub quantity: u32,
    pub line_total: f64,
    #[serde(default)]
    pub variation: Option<CartVariation>,
    /// Product as it was when added.
    pub product: Product,
}

impl CartItem {
    fn matches(&self, product_id: u64, variation: Option<&CartVariation>) -> bool {
        self.product_id == product_id && self.variation.as_ref() == variation
    }

    fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
        self.line_total = self.price * f64::from(quantity);
    }
}

/// Cart contents and totals.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<CartItem>,
    pub item_count: u32,
    pub subtotal: f64,
    pub shipping_total: f64,
    pub tax_total: f64,
    pub total: f64,
}

impl Cart {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn item(&self, key: &CartItemKey) -> Option<&CartItem> {
        self.items.iter().find(|item| &item.key == key)
    }

    /// Adds `quantity` of `product`, merging with an existing line for the
    /// same product and variation. Returns the key of the affected line.
    pub fn add(
        &mut self,
        product: &Product,
        quantity: u32,
        variation: Option<CartVariation>,
    ) -> CartItemKey {
        let existing = self
            .items
            .iter_mut()
            .find(|item| item.matches(product.id, variation.as_ref()));

        let key = match existing {
            Some(item) => {
                item.set_quantity(item.quantity + quantity);
                item.key
            }
            None => {
                let price = product.unit_price();
                let item = CartItem {
                    key: CartItemKey::new(),
                    product_id: product.id,
                    name: product.name.clone(),
                    price,
                    quantity,
                    line_total: price * f64::from(quantity),
                    variation,
                    product: product.clone(),
                };
                let key = item.key;
                self.items.push(item);
                key
            }
        };
        self.recompute();
        key
    }

    /// Removes the line `key`. Returns false if there was none.
    pub fn remove(&mut self, key: &CartItemKey) -> bool {
        let before = self.items.len();
        self.items.retain(|item| &item.key != key);
        self.recompute();
        self.items.len() != before
    }

    /// Sets the quantity of line `key`; zero removes the line.
    pub fn update_quantity(&mut self, key: &CartItemKey, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove(key);
        }
        let Some(item) = self.items.iter_mut().find(|item| &item.key == key) else {
            return false;
        };
        item.set_quantity(quantity);
        self.recompute();
        true
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.recompute();
    }

    fn recompute(&mut self) {
        self.item_count = self.items.iter().map(|item| item.quantity).sum();
        self.subtotal = self.items.iter().map(|item| item.line_total).sum();
        self.total = self.subtotal + self.shipping_total + self.tax_total;
    }

    /// Builds an order for the cart's lines.
    #[must_use]
    pub fn to_order(
        &self,
        payment_method: &str,
        payment_method_title: &str,
        billing: Address,
        shipping: Address,
    ) -> NewOrder {
        NewOrder {
            payment_method: payment_method.to_string(),
            payment_method_title: payment_method_title.to_string(),
            set_paid: false,
            billing,
            shipping,
            line_items: self
                .items
                .iter()
                .map(|item| NewLineItem {
                    product_id: item.product_id,
                    variation_id: item.variation.as_ref().map(|v| v.variation_id),
                    quantity: item.quantity,
                })
                .collect(),
            customer_note: None,
        }
    }
}

/// The cart shared by the application, saved after every change.
pub struct CartStore {
    storage: Arc<dyn ClientStorage>,
    cart: Mutex<Cart>,
    changes: watch::Sender<Cart>,
}

impl CartStore {
    /// Loads the stored cart. A missing or unreadable cart is empty.
    #[must_use]
    pub fn load(storage: Arc<dyn ClientStorage>) -> Self {
        let cart = match get_json::<Cart>(storage.as_ref(), keys::CART) {
            Ok(Some(cart)) => cart,
            Ok(None) => Cart::empty(),
            Err(error) => {
                warn!(%error, "could not load cart, starting empty");
                Cart::empty()
            }
        };
        debug!(items = cart.item_count, "cart loaded");
        let (changes, _) = watch::channel(cart.clone());
        Self {
            storage,
            cart: Mutex::new(cart),
            changes,
        }
    }

    /// Returns a copy of the cart.
    #[must_use]
    pub fn cart(&self) -> Cart {
        self.cart.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Subscribes to cart changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Cart> {
        self.changes.subscribe()
    }

    pub fn add(
        &self,
        product: &Product,
        quantity: u32,
        variation: Option<CartVariation>,
    ) -> CartItemKey {
        self.update(|cart| cart.add(product, quantity, variation))
    }

    pub fn remove(&self, key: &CartItemKey) -> bool {
        self.update(|cart| cart.remove(key))
    }

    pub fn update_quantity(&self, key: &CartItemKey, quantity: u32) -> bool {
        self.update(|cart| cart.update_quantity(key, quantity))
    }

    pub fn clear(&self) {
        self.update(Cart::clear);
    }

    fn update<R>(&self, change: impl FnOnce(&mut Cart) -> R) -> R {
        let mut cart = self.cart.lock().unwrap_or_else(PoisonError::into_inner);
        let result = change(&mut cart);
        if let Err(error) = set_json(self.storage.as_ref(), keys::CART, &*cart) {
            warn!(%error, "could not save cart");
        }
        debug!(items = cart.item_count, total = cart.total, "cart updated");
        self.changes.send_replace(cart.clone());
        result
    }
}
