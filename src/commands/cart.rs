//! Cart commands.

use serde::Deserialize;
use serde_json::Value;

use crate::cart::{CartProduct, CartState};
use crate::commands::payload_arg0_as_i64;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddItemPayload {
    product: CartProduct,
    #[serde(default = "default_quantity", alias = "qty", alias = "delta")]
    quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

fn parse_add_item_payload(arg0: Option<Value>) -> Result<AddItemPayload, String> {
    let value = arg0.ok_or("Missing cart item payload")?;
    serde_json::from_value(value).map_err(|e| format!("Invalid cart item payload: {e}"))
}

fn parse_product_id(arg0: Option<Value>) -> Result<i64, String> {
    payload_arg0_as_i64(arg0, &["productId", "product_id", "proId", "pro_id", "id"])
        .ok_or("Missing product id".to_string())
}

fn summary_json(cart: &CartState) -> Result<Value, String> {
    serde_json::to_value(cart.summary()).map_err(|e| e.to_string())
}

#[tauri::command]
pub fn cart_get_state(cart: tauri::State<'_, CartState>) -> Result<Value, String> {
    summary_json(&cart)
}

#[tauri::command]
pub fn cart_add_item(
    arg0: Option<Value>,
    cart: tauri::State<'_, CartState>,
) -> Result<Value, String> {
    let payload = parse_add_item_payload(arg0)?;
    cart.add_item(&payload.product, payload.quantity);
    summary_json(&cart)
}

#[tauri::command]
pub fn cart_remove_item(
    arg0: Option<Value>,
    cart: tauri::State<'_, CartState>,
) -> Result<Value, String> {
    let product_id = parse_product_id(arg0)?;
    cart.remove_item(product_id);
    summary_json(&cart)
}

#[tauri::command]
pub fn cart_clear(cart: tauri::State<'_, CartState>) -> Result<Value, String> {
    cart.clear();
    summary_json(&cart)
}
