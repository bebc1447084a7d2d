//! Checkout wizard commands.

use serde_json::Value;
use tracing::info;

use crate::checkout::{self, CheckoutState, PaymentMethod};
use crate::commands::payload_arg0_as_string;

fn parse_payment_method(arg0: Option<Value>) -> Result<PaymentMethod, String> {
    let raw = payload_arg0_as_string(arg0, &["method", "paymentMethod", "payment_method"])
        .ok_or("Missing payment method")?;
    match raw.to_ascii_lowercase().as_str() {
        "qris" => Ok(PaymentMethod::Qris),
        "cash" => Ok(PaymentMethod::Cash),
        other => Err(format!("Unknown payment method: {other}")),
    }
}

fn wizard_json(wizard: checkout::Wizard) -> Result<Value, String> {
    serde_json::to_value(wizard).map_err(|e| e.to_string())
}

#[tauri::command]
pub fn checkout_get_state(checkout: tauri::State<'_, CheckoutState>) -> Result<Value, String> {
    wizard_json(checkout.wizard())
}

#[tauri::command]
pub fn checkout_set_payment_method(
    arg0: Option<Value>,
    checkout: tauri::State<'_, CheckoutState>,
) -> Result<Value, String> {
    let method = parse_payment_method(arg0)?;
    wizard_json(checkout.set_payment_method(method)?)
}

/// "Process Payment" on the cart step.
#[tauri::command]
pub async fn checkout_process_payment(app: tauri::AppHandle) -> Result<Value, String> {
    wizard_json(checkout::process_payment(&app).await?)
}

/// "I Have Paid" on the QRIS screen.
#[tauri::command]
pub async fn checkout_confirm_payment(app: tauri::AppHandle) -> Result<Value, String> {
    wizard_json(checkout::confirm_payment(&app).await?)
}

#[tauri::command]
pub fn checkout_back_to_cart(checkout: tauri::State<'_, CheckoutState>) -> Result<Value, String> {
    wizard_json(checkout.back_to_cart()?)
}

/// "New Transaction" on the receipt. Resets the wizard only; the cart was
/// already cleared when the order was finalized.
#[tauri::command]
pub fn checkout_new_transaction(
    checkout: tauri::State<'_, CheckoutState>,
) -> Result<Value, String> {
    wizard_json(checkout.new_transaction())
}

#[tauri::command]
pub async fn receipt_email(app: tauri::AppHandle) -> Result<Value, String> {
    checkout::email_receipt(&app).await
}

/// Hand printing to the webview's native print dialog.
#[tauri::command]
pub fn receipt_print(window: tauri::WebviewWindow) -> Result<(), String> {
    info!("receipt print requested");
    window.eval("window.print();").map_err(|e| e.to_string())
}

#[cfg(test)]
mod dto_tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payment_method_parses_keyed_and_bare_forms() {
        assert_eq!(
            parse_payment_method(Some(json!({ "method": "qris" }))).expect("qris"),
            PaymentMethod::Qris
        );
        assert_eq!(
            parse_payment_method(Some(json!({ "paymentMethod": "CASH" }))).expect("cash"),
            PaymentMethod::Cash
        );
        assert_eq!(
            parse_payment_method(Some(json!("cash"))).expect("bare"),
            PaymentMethod::Cash
        );
    }

    #[test]
    fn payment_method_rejects_unknown_values() {
        let err = parse_payment_method(Some(json!({ "method": "card" })))
            .expect_err("card is not offered");
        assert_eq!(err, "Unknown payment method: card");
        assert!(parse_payment_method(None).is_err());
    }
}
