//! Product catalog: list, detail, hero slides, and the refresh poller.
//!
//! The catalog is read-through: every fetch goes to the backend and the
//! latest successful product list is cached in memory for the views and the
//! poll-status command. Polling is explicit; a view starts it when it mounts
//! and stops it when it unmounts, and the loop dies with its cancellation
//! token rather than running for the life of the process.

use chrono::Utc;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::sync::Mutex;
use std::time::Duration;
use tauri::{Emitter, Manager};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{self, ApiError, INVALID_FORMAT};
use crate::cart::round2;
use crate::config::ConfigState;

/// Maximum number of related products shown on a detail view.
pub const RELATED_LIMIT: usize = 4;

/// Event emitted after a poll cycle lands a changed product list.
pub const EVENT_CATALOG_UPDATED: &str = "catalog_updated";
/// Event emitted when a poll cycle fails.
pub const EVENT_CATALOG_ERROR: &str = "catalog_error";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Product category as embedded in catalog rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub cat_name: String,
}

/// A catalog product. Field names mirror the backend rows (`pro_id`,
/// `pro_name`) so the frontend sees the same shape it always has; numeric
/// fields tolerate the backend's habit of serialising decimals as strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "pro_id", deserialize_with = "lenient_i64")]
    pub id: i64,
    #[serde(rename = "pro_name")]
    pub name: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub price: f64,
    /// Discount percentage, 0 when absent.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub discount: f64,
    /// Units in stock; detail views clamp their quantity picker to this.
    #[serde(default, deserialize_with = "lenient_i64")]
    pub qty: i64,
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    /// Only present on the detail endpoint; drives the related lookup.
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub category_id: Option<i64>,
    /// Price after discount, computed at decode time.
    #[serde(skip_deserializing)]
    pub final_price: f64,
}

impl Product {
    fn finalized(mut self) -> Self {
        self.final_price = discounted_price(self.price, self.discount);
        self
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| D::Error::custom("number out of range")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| D::Error::custom(format!("invalid number: {s}"))),
        Value::Null => Ok(0.0),
        other => Err(D::Error::custom(format!("expected number, got {other}"))),
    }
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| D::Error::custom("number out of range")),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .or_else(|_| trimmed.parse::<f64>().map(|f| f as i64))
                .map_err(|_| D::Error::custom(format!("invalid number: {s}")))
        }
        Value::Null => Ok(0),
        other => Err(D::Error::custom(format!("expected number, got {other}"))),
    }
}

fn lenient_opt_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))),
        Value::String(s) => Ok(s.trim().parse::<i64>().ok()),
        _ => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// Decoding and pure catalog rules
// ---------------------------------------------------------------------------

/// Decode the unwrapped `data` document of the product list endpoint.
pub fn decode_products(data: Value) -> Result<Vec<Product>, ApiError> {
    let products: Vec<Product> = serde_json::from_value(data).map_err(|e| {
        warn!(error = %e, "product list decode failed");
        ApiError::Shape(INVALID_FORMAT.to_string())
    })?;
    Ok(products.into_iter().map(Product::finalized).collect())
}

/// Decode the unwrapped `data` document of the single-product endpoint.
pub fn decode_product(data: Value) -> Result<Product, ApiError> {
    let product: Product = serde_json::from_value(data).map_err(|e| {
        warn!(error = %e, "product decode failed");
        ApiError::Shape(INVALID_FORMAT.to_string())
    })?;
    Ok(product.finalized())
}

/// Price after applying a percentage discount, rounded to two decimals.
pub fn discounted_price(price: f64, discount: f64) -> f64 {
    round2(price - price * (discount / 100.0))
}

/// Unique category names in first-seen order, with "all" prepended.
pub fn derive_categories(products: &[Product]) -> Vec<String> {
    let mut categories = vec!["all".to_string()];
    for product in products {
        if let Some(category) = &product.category {
            if !category.cat_name.is_empty() && !categories.contains(&category.cat_name) {
                categories.push(category.cat_name.clone());
            }
        }
    }
    categories
}

/// Filter by category name, case-insensitively. "all" selects everything.
pub fn filter_by_category(products: &[Product], category: &str) -> Vec<Product> {
    if category.eq_ignore_ascii_case("all") {
        return products.to_vec();
    }
    products
        .iter()
        .filter(|p| {
            p.category
                .as_ref()
                .map(|c| c.cat_name.eq_ignore_ascii_case(category))
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

/// Related products for a detail view: same pool, current product excluded,
/// capped at [`RELATED_LIMIT`].
pub fn related_products(pool: &[Product], current_id: i64) -> Vec<Product> {
    pool.iter()
        .filter(|p| p.id != current_id)
        .take(RELATED_LIMIT)
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// Fetches
// ---------------------------------------------------------------------------

/// Fetch and decode the full product list.
pub async fn fetch_products(backend_url: &str) -> Result<Vec<Product>, ApiError> {
    let raw = api::get_json(backend_url, "/api/products").await?;
    decode_products(api::unwrap_envelope(raw)?)
}

/// Fetch one product plus its related products.
///
/// The related lookup keys off the detail payload's `category_id`; a failure
/// there degrades to an empty list instead of sinking the whole detail view.
pub async fn fetch_product_detail(
    backend_url: &str,
    product_id: i64,
) -> Result<(Product, Vec<Product>), ApiError> {
    let raw = api::get_json(backend_url, &format!("/api/products/{product_id}")).await?;
    let product = decode_product(api::unwrap_envelope(raw)?)?;

    let related = match product.category_id {
        Some(category_id) => match fetch_related(backend_url, category_id, product.id).await {
            Ok(related) => related,
            Err(err) => {
                warn!(product_id, error = %err, "related products fetch failed");
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    Ok((product, related))
}

async fn fetch_related(
    backend_url: &str,
    category_id: i64,
    current_id: i64,
) -> Result<Vec<Product>, ApiError> {
    let raw = api::get_json(backend_url, &format!("/api/products?category={category_id}")).await?;
    let pool = decode_products(api::unwrap_envelope(raw)?)?;
    Ok(related_products(&pool, current_id))
}

/// Fetch the marketing hero slides. The rows are passed through untyped; the
/// frontend owns their presentation.
pub async fn fetch_heroes(backend_url: &str) -> Result<Value, ApiError> {
    let raw = api::get_json(backend_url, "/api/slide-heroes").await?;
    api::unwrap_envelope(raw)
}

// ---------------------------------------------------------------------------
// State and poller
// ---------------------------------------------------------------------------

/// Managed catalog state: the latest product list plus poller bookkeeping.
#[derive(Debug, Default)]
pub struct CatalogState {
    products: Mutex<Vec<Product>>,
    last_updated: Mutex<Option<String>>,
    last_error: Mutex<Option<String>>,
    poll_token: Mutex<Option<CancellationToken>>,
}

impl CatalogState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn products(&self) -> Vec<Product> {
        self.products.lock().unwrap().clone()
    }

    pub fn product_count(&self) -> usize {
        self.products.lock().unwrap().len()
    }

    pub fn categories(&self) -> Vec<String> {
        derive_categories(&self.products.lock().unwrap())
    }

    /// Replace the cached list. Returns true when the list actually changed.
    pub fn store_products(&self, products: Vec<Product>) -> bool {
        let changed = {
            let mut cached = self.products.lock().unwrap();
            let changed = *cached != products;
            *cached = products;
            changed
        };
        *self.last_updated.lock().unwrap() = Some(Utc::now().to_rfc3339());
        *self.last_error.lock().unwrap() = None;
        changed
    }

    pub fn record_error(&self, message: &str) {
        *self.last_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().unwrap().clone()
    }

    pub fn last_updated(&self) -> Option<String> {
        self.last_updated.lock().unwrap().clone()
    }

    /// Arm a fresh poll token, cancelling any loop already running.
    fn begin_polling(&self) -> CancellationToken {
        let mut slot = self.poll_token.lock().unwrap();
        if let Some(existing) = slot.take() {
            existing.cancel();
        }
        let token = CancellationToken::new();
        *slot = Some(token.clone());
        token
    }

    /// Cancel the poll loop. Returns whether one was running.
    pub fn stop_polling(&self) -> bool {
        let mut slot = self.poll_token.lock().unwrap();
        match slot.take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_polling(&self) -> bool {
        self.poll_token.lock().unwrap().is_some()
    }
}

/// Fetch the product list once, updating the cache and emitting
/// [`EVENT_CATALOG_UPDATED`] / [`EVENT_CATALOG_ERROR`].
pub async fn refresh_catalog(app: &tauri::AppHandle) -> Result<usize, String> {
    let backend_url = app.state::<ConfigState>().backend_url();
    let catalog = app.state::<CatalogState>();

    match fetch_products(&backend_url).await {
        Ok(products) => {
            let count = products.len();
            let changed = catalog.store_products(products);
            debug!(count, changed, "catalog refreshed");
            if changed {
                let _ = app.emit(
                    EVENT_CATALOG_UPDATED,
                    json!({
                        "count": count,
                        "categories": catalog.categories(),
                        "timestamp": Utc::now().to_rfc3339(),
                    }),
                );
            }
            Ok(count)
        }
        Err(err) => {
            let message = err.to_string();
            warn!(error = %message, "catalog refresh failed");
            catalog.record_error(&message);
            let _ = app.emit(
                EVENT_CATALOG_ERROR,
                json!({
                    "error": message,
                    "timestamp": Utc::now().to_rfc3339(),
                }),
            );
            Err(message)
        }
    }
}

/// Start the catalog poll loop. The first cycle runs immediately, then every
/// `interval`, until the token armed here is cancelled (by `stop_polling` or
/// by a replacing `start_polling` call).
pub fn start_polling(app: tauri::AppHandle, interval: Duration) {
    let token = app.state::<CatalogState>().begin_polling();
    info!(interval_secs = interval.as_secs(), "catalog polling started");

    tauri::async_runtime::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("catalog polling stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let _ = refresh_catalog(&app).await;
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_products() -> Vec<Product> {
        decode_products(json!([
            {
                "pro_id": 1,
                "pro_name": "Espresso",
                "price": "18000.50",
                "discount": "0",
                "qty": "12",
                "image": "/assets/products/espresso.png",
                "category": { "cat_name": "Coffee" }
            },
            {
                "pro_id": 2,
                "pro_name": "Matcha Latte",
                "price": 25000.0,
                "discount": 20,
                "qty": 5,
                "image": "/assets/products/matcha.png",
                "category": { "cat_name": "Non-Coffee" }
            },
            {
                "pro_id": 3,
                "pro_name": "Butter Croissant",
                "price": 15000.0,
                "qty": 8,
                "category": { "cat_name": "Pastry" }
            },
            {
                "pro_id": 4,
                "pro_name": "Cold Brew",
                "price": 22000.0,
                "discount": null,
                "qty": 3,
                "category": { "cat_name": "Coffee" }
            },
            {
                "pro_id": 5,
                "pro_name": "Mystery Box",
                "price": 50000.0,
                "qty": 1
            }
        ]))
        .expect("sample products should decode")
    }

    #[test]
    fn decode_tolerates_string_numbers_and_missing_fields() {
        let products = sample_products();
        assert_eq!(products.len(), 5);

        let espresso = &products[0];
        assert_eq!(espresso.id, 1);
        assert_eq!(espresso.price, 18000.50);
        assert_eq!(espresso.discount, 0.0);
        assert_eq!(espresso.qty, 12);

        let croissant = &products[2];
        assert_eq!(croissant.discount, 0.0);
        assert_eq!(croissant.image, "");

        let cold_brew = &products[3];
        assert_eq!(cold_brew.discount, 0.0);
    }

    #[test]
    fn decode_computes_the_discounted_final_price() {
        let products = sample_products();
        let matcha = &products[1];
        assert_eq!(matcha.final_price, 20000.0);

        let espresso = &products[0];
        assert_eq!(espresso.final_price, 18000.50);
    }

    #[test]
    fn decode_rejects_a_non_list_document() {
        let err = decode_products(json!({ "not": "a list" }))
            .expect_err("object instead of list should fail");
        assert_eq!(err.to_string(), INVALID_FORMAT);
    }

    #[test]
    fn product_serialises_with_backend_field_names() {
        let products = sample_products();
        let value = serde_json::to_value(&products[0]).expect("serialise");
        assert_eq!(value.get("pro_id"), Some(&json!(1)));
        assert_eq!(value.get("pro_name"), Some(&json!("Espresso")));
        assert_eq!(value.get("final_price"), Some(&json!(18000.50)));
    }

    #[test]
    fn discounted_price_rounds_to_two_decimals() {
        assert_eq!(discounted_price(19.99, 10.0), 17.99);
        assert_eq!(discounted_price(100.0, 25.0), 75.0);
        assert_eq!(discounted_price(100.0, 0.0), 100.0);
    }

    #[test]
    fn categories_are_unique_in_first_seen_order_behind_all() {
        let categories = derive_categories(&sample_products());
        assert_eq!(categories, vec!["all", "Coffee", "Non-Coffee", "Pastry"]);
    }

    #[test]
    fn filter_matches_case_insensitively() {
        let products = sample_products();

        let coffee = filter_by_category(&products, "coffee");
        assert_eq!(coffee.len(), 2);
        assert!(coffee.iter().all(|p| {
            p.category
                .as_ref()
                .map(|c| c.cat_name == "Coffee")
                .unwrap_or(false)
        }));

        let all = filter_by_category(&products, "ALL");
        assert_eq!(all.len(), products.len());

        let none = filter_by_category(&products, "Tea");
        assert!(none.is_empty());
    }

    #[test]
    fn uncategorised_products_only_appear_under_all() {
        let products = sample_products();
        let all = filter_by_category(&products, "all");
        assert!(all.iter().any(|p| p.id == 5));
        let pastry = filter_by_category(&products, "Pastry");
        assert!(pastry.iter().all(|p| p.id != 5));
    }

    #[test]
    fn related_excludes_self_and_caps_the_list() {
        let pool = decode_products(json!([
            { "pro_id": 1, "pro_name": "A", "price": 1.0 },
            { "pro_id": 2, "pro_name": "B", "price": 1.0 },
            { "pro_id": 3, "pro_name": "C", "price": 1.0 },
            { "pro_id": 4, "pro_name": "D", "price": 1.0 },
            { "pro_id": 5, "pro_name": "E", "price": 1.0 },
            { "pro_id": 6, "pro_name": "F", "price": 1.0 }
        ]))
        .expect("pool should decode");

        let related = related_products(&pool, 2);
        let ids: Vec<i64> = related.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 3, 4, 5]);
    }

    #[test]
    fn store_products_detects_changes() {
        let state = CatalogState::new();
        assert!(state.store_products(sample_products()));
        assert!(!state.store_products(sample_products()));
        assert!(state.last_updated().is_some());
        assert_eq!(state.product_count(), 5);

        let mut shrunk = sample_products();
        shrunk.pop();
        assert!(state.store_products(shrunk));
        assert_eq!(state.product_count(), 4);
    }

    #[test]
    fn a_successful_store_clears_the_recorded_error() {
        let state = CatalogState::new();
        state.record_error("Cannot reach backend at http://localhost:8000");
        assert!(state.last_error().is_some());
        state.store_products(sample_products());
        assert_eq!(state.last_error(), None);
    }

    #[test]
    fn poll_token_lifecycle() {
        let state = CatalogState::new();
        assert!(!state.is_polling());
        assert!(!state.stop_polling());

        let first = state.begin_polling();
        assert!(state.is_polling());
        assert!(!first.is_cancelled());

        // Re-arming cancels the previous loop's token.
        let second = state.begin_polling();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());

        assert!(state.stop_polling());
        assert!(second.is_cancelled());
        assert!(!state.is_polling());
    }
}
