//! Catalog commands: product list/detail, hero slides, poller control.

use serde_json::{json, Value};
use std::time::Duration;

use crate::catalog::{self, CatalogState};
use crate::commands::{payload_arg0_as_i64, payload_arg0_as_string};
use crate::config::{ConfigState, MIN_POLL_INTERVAL_SECS};

fn parse_category(arg0: Option<Value>) -> Option<String> {
    payload_arg0_as_string(arg0, &["category", "cat", "catName", "cat_name"])
}

fn parse_product_id(arg0: Option<Value>) -> Result<i64, String> {
    payload_arg0_as_i64(arg0, &["productId", "product_id", "proId", "pro_id", "id"])
        .ok_or("Missing product id".to_string())
}

fn parse_poll_interval(arg0: Option<Value>, default_secs: u64) -> u64 {
    payload_arg0_as_i64(arg0, &["intervalSecs", "interval_secs", "seconds", "interval"])
        .and_then(|v| u64::try_from(v).ok())
        .map(|secs| secs.max(MIN_POLL_INTERVAL_SECS))
        .unwrap_or(default_secs)
}

/// Fetch the catalog and return it, optionally filtered to one category.
/// The category list always reflects the full catalog so the filter bar
/// stays complete.
#[tauri::command]
pub async fn catalog_get_products(
    arg0: Option<Value>,
    app: tauri::AppHandle,
    catalog: tauri::State<'_, CatalogState>,
) -> Result<Value, String> {
    let category = parse_category(arg0);
    catalog::refresh_catalog(&app).await?;

    let products = catalog.products();
    let filtered = match &category {
        Some(name) => catalog::filter_by_category(&products, name),
        None => products,
    };
    Ok(json!({
        "products": filtered,
        "categories": catalog.categories(),
        "activeCategory": category.unwrap_or_else(|| "all".to_string()),
    }))
}

#[tauri::command]
pub fn catalog_get_categories(catalog: tauri::State<'_, CatalogState>) -> Result<Value, String> {
    Ok(json!({ "categories": catalog.categories() }))
}

/// Manual retry for the catalog views.
#[tauri::command]
pub async fn catalog_refresh(app: tauri::AppHandle) -> Result<Value, String> {
    let count = catalog::refresh_catalog(&app).await?;
    Ok(json!({ "count": count }))
}

#[tauri::command]
pub async fn catalog_get_product_detail(
    arg0: Option<Value>,
    config: tauri::State<'_, ConfigState>,
) -> Result<Value, String> {
    let product_id = parse_product_id(arg0)?;
    let backend_url = config.backend_url();
    let (product, related) = catalog::fetch_product_detail(&backend_url, product_id)
        .await
        .map_err(|e| e.to_string())?;
    Ok(json!({ "product": product, "related": related }))
}

#[tauri::command]
pub async fn catalog_get_heroes(config: tauri::State<'_, ConfigState>) -> Result<Value, String> {
    let backend_url = config.backend_url();
    let heroes = catalog::fetch_heroes(&backend_url)
        .await
        .map_err(|e| e.to_string())?;
    Ok(json!({ "heroes": heroes }))
}

/// Start (or restart) the catalog poll loop. Meant to be called when a
/// catalog view mounts; the matching stop call belongs in its unmount.
#[tauri::command]
pub fn catalog_start_polling(
    arg0: Option<Value>,
    app: tauri::AppHandle,
    config: tauri::State<'_, ConfigState>,
) -> Result<Value, String> {
    let interval_secs = parse_poll_interval(arg0, config.poll_interval().as_secs());
    catalog::start_polling(app, Duration::from_secs(interval_secs));
    Ok(json!({ "polling": true, "intervalSecs": interval_secs }))
}

#[tauri::command]
pub fn catalog_stop_polling(catalog: tauri::State<'_, CatalogState>) -> Result<Value, String> {
    let stopped = catalog.stop_polling();
    Ok(json!({ "polling": false, "stopped": stopped }))
}

#[tauri::command]
pub fn catalog_get_poll_status(catalog: tauri::State<'_, CatalogState>) -> Result<Value, String> {
    Ok(json!({
        "polling": catalog.is_polling(),
        "productCount": catalog.product_count(),
        "lastUpdated": catalog.last_updated(),
        "lastError": catalog.last_error(),
    }))
}
