//! POS checkout wizard.
//!
//! A three-step flow over the cart: `cart` (review + payment method) ->
//! `payment` (QRIS pending) -> `receipt`. Cash skips the payment step. Order
//! submission is fail-closed: when the backend rejects or cannot be reached
//! the wizard stays where it is and the cart is untouched. Demo mode
//! (`CAFFERINE_DEMO_MODE`) is the single exception and only tolerates
//! transport failures, never an HTTP rejection.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Mutex;
use tauri::{Emitter, Manager};
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::{self, ApiError};
use crate::cart::{round2, CartLine, CartState, TAX_RATE};
use crate::config::ConfigState;
use crate::session::{SessionState, User};

/// Static QR image shown while a QRIS payment is pending. The flow is a
/// simulation; no payment gateway is involved.
const QRIS_IMAGE_PLACEHOLDER: &str = "/assets/team/qr.png";

/// Event emitted after an order is accepted.
pub const EVENT_ORDER_CREATED: &str = "order_created";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WizardStep {
    Cart,
    Payment,
    Receipt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Qris,
    Cash,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Qris => "qris",
            PaymentMethod::Cash => "cash",
        }
    }
}

/// POS money totals: flat tax on the subtotal, nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
}

/// Compute POS totals for a set of cart lines.
pub fn totals(lines: &[CartLine]) -> Totals {
    let subtotal: f64 = lines.iter().map(|l| l.price * l.quantity as f64).sum();
    let tax = subtotal * TAX_RATE;
    Totals {
        subtotal,
        tax,
        total: subtotal + tax,
    }
}

/// The sold-items snapshot taken at finalization, before the cart is
/// cleared. The receipt view renders from this, never from the live cart.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub order_id: String,
    pub order_date: String,
    pub cashier: Option<String>,
    pub payment_method: PaymentMethod,
    pub items: Vec<CartLine>,
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
}

/// Full wizard state, serialised as-is to the frontend.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Wizard {
    pub step: WizardStep,
    pub payment_method: PaymentMethod,
    pub order_id: Option<String>,
    pub order_date: Option<String>,
    pub qris_content: Option<String>,
    pub qris_image: Option<String>,
    pub receipt: Option<Receipt>,
}

impl Default for Wizard {
    fn default() -> Self {
        Wizard {
            step: WizardStep::Cart,
            payment_method: PaymentMethod::Qris,
            order_id: None,
            order_date: None,
            qris_content: None,
            qris_image: None,
            receipt: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Pure order helpers
// ---------------------------------------------------------------------------

/// Mint a client order id. This is a correlation token, not the canonical
/// id: the backend's `order_id` replaces it on success. Collision-resistant
/// so that two terminals can never mint the same token.
pub fn new_order_id() -> String {
    format!("POS-{}", Uuid::new_v4())
}

/// Displayable QRIS payload for the pending-payment screen.
pub fn qris_content(order_id: &str, total: f64) -> String {
    format!("BRI.QRIS.ID.{order_id}.{total:.2}")
}

/// Assemble the `/api/orders` request body. Line prices travel as stored;
/// the aggregate money fields are rounded to two decimals.
pub fn build_order_payload(
    lines: &[CartLine],
    totals: &Totals,
    method: PaymentMethod,
    user: Option<&User>,
    order_id: &str,
) -> Value {
    json!({
        "items": lines
            .iter()
            .map(|l| json!({ "id": l.id, "quantity": l.quantity, "price": l.price }))
            .collect::<Vec<Value>>(),
        "subtotal": round2(totals.subtotal),
        "tax": round2(totals.tax),
        "shipping": 0,
        "discount": 0,
        "total": round2(totals.total),
        "payment_method": method,
        "payment_ref": Value::Null,
        "promo_code": "",
        "notes": "POS",
        "email": user.map(|u| u.email.as_str()),
        "user_id": user.map(|u| u.id),
        "order_id": order_id,
    })
}

/// Pull the canonical order id out of a successful `/api/orders` response,
/// shaped `{ "data": { "order_id": ... } }`.
pub fn extract_server_order_id(response: &Value) -> Option<String> {
    match response.get("data")?.get("order_id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Decide the final order id from the submission outcome.
///
/// Success adopts the server id when one came back. A transport failure is
/// tolerated only in demo mode, keeping the client id; the second tuple
/// field reports that tolerance so callers can log it. Any HTTP rejection
/// fails the sale with the backend's message.
pub fn resolve_order_id(
    outcome: Result<Option<String>, ApiError>,
    client_order_id: &str,
    demo_mode: bool,
) -> Result<(String, bool), String> {
    match outcome {
        Ok(Some(server_id)) => Ok((server_id, false)),
        Ok(None) => Ok((client_order_id.to_string(), false)),
        Err(err) if err.is_network() && demo_mode => Ok((client_order_id.to_string(), true)),
        Err(err) => Err(err.to_string()),
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Managed wizard state.
#[derive(Debug, Default)]
pub struct CheckoutState {
    wizard: Mutex<Wizard>,
}

impl CheckoutState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wizard(&self) -> Wizard {
        self.wizard.lock().unwrap().clone()
    }

    /// Fail unless the wizard currently sits on `required`.
    fn require_step(&self, required: WizardStep) -> Result<(), String> {
        let wizard = self.wizard.lock().unwrap();
        if wizard.step == required {
            return Ok(());
        }
        Err(match required {
            WizardStep::Cart => "Checkout already in progress".to_string(),
            WizardStep::Payment => "No pending payment to confirm".to_string(),
            WizardStep::Receipt => "No completed order".to_string(),
        })
    }

    /// Select qris/cash. Only allowed on the cart step; once payment starts
    /// the method is part of the order.
    pub fn set_payment_method(&self, method: PaymentMethod) -> Result<Wizard, String> {
        let mut wizard = self.wizard.lock().unwrap();
        if wizard.step != WizardStep::Cart {
            return Err("Payment method is locked once payment starts".to_string());
        }
        wizard.payment_method = method;
        Ok(wizard.clone())
    }

    /// Enter the QRIS pending-payment step: mint a fresh order id and date,
    /// build the display payload, advance to `payment`. No backend call is
    /// made here; that happens on confirmation.
    fn begin_qris(&self, totals: &Totals) -> Result<Wizard, String> {
        let mut wizard = self.wizard.lock().unwrap();
        if wizard.step != WizardStep::Cart {
            return Err("Checkout already in progress".to_string());
        }
        let order_id = new_order_id();
        info!(order_id = %order_id, total = round2(totals.total), "qris payment pending");
        wizard.qris_content = Some(qris_content(&order_id, totals.total));
        wizard.qris_image = Some(QRIS_IMAGE_PLACEHOLDER.to_string());
        wizard.order_id = Some(order_id);
        wizard.order_date = Some(Utc::now().to_rfc3339());
        wizard.step = WizardStep::Payment;
        Ok(wizard.clone())
    }

    /// Leave the QRIS screen without paying. Pending order fields stay; the
    /// next payment attempt overwrites them.
    pub fn back_to_cart(&self) -> Result<Wizard, String> {
        let mut wizard = self.wizard.lock().unwrap();
        if wizard.step != WizardStep::Payment {
            return Err("No pending payment to leave".to_string());
        }
        wizard.step = WizardStep::Cart;
        Ok(wizard.clone())
    }

    /// Reset for the next customer. Never fails and never touches the cart
    /// (finalization already emptied it).
    pub fn new_transaction(&self) -> Wizard {
        let mut wizard = self.wizard.lock().unwrap();
        *wizard = Wizard::default();
        info!("wizard reset for new transaction");
        wizard.clone()
    }

    /// The order id and method a finalization attempt should submit with.
    /// Mints and stores the id/date on first use (cash path) so a failed
    /// attempt retries under the same correlation token.
    fn finalize_context(&self) -> (String, PaymentMethod) {
        let mut wizard = self.wizard.lock().unwrap();
        if wizard.order_id.is_none() {
            wizard.order_id = Some(new_order_id());
        }
        if wizard.order_date.is_none() {
            wizard.order_date = Some(Utc::now().to_rfc3339());
        }
        (
            wizard.order_id.clone().unwrap_or_default(),
            wizard.payment_method,
        )
    }

    /// Record the accepted order: adopt the final id, snapshot the receipt,
    /// advance to the receipt step.
    fn complete_order(
        &self,
        order_id: String,
        items: Vec<CartLine>,
        totals: &Totals,
        cashier: Option<String>,
    ) -> Wizard {
        let mut wizard = self.wizard.lock().unwrap();
        let order_date = wizard
            .order_date
            .clone()
            .unwrap_or_else(|| Utc::now().to_rfc3339());
        wizard.order_id = Some(order_id.clone());
        wizard.order_date = Some(order_date.clone());
        wizard.receipt = Some(Receipt {
            order_id,
            order_date,
            cashier,
            payment_method: wizard.payment_method,
            items,
            subtotal: round2(totals.subtotal),
            tax: round2(totals.tax),
            total: round2(totals.total),
        });
        wizard.step = WizardStep::Receipt;
        wizard.clone()
    }
}

// ---------------------------------------------------------------------------
// Flow
// ---------------------------------------------------------------------------

/// "Process Payment" on the cart step. QRIS advances to the pending-payment
/// screen without contacting the backend; cash submits the order directly.
pub async fn process_payment(app: &tauri::AppHandle) -> Result<Wizard, String> {
    let checkout = app.state::<CheckoutState>();
    let cart = app.state::<CartState>();

    checkout.require_step(WizardStep::Cart)?;
    if cart.is_empty() {
        return Err("Cart is empty".to_string());
    }

    match checkout.wizard().payment_method {
        PaymentMethod::Qris => {
            let totals = totals(&cart.lines());
            checkout.begin_qris(&totals)
        }
        PaymentMethod::Cash => finalize_order(app, WizardStep::Cart).await,
    }
}

/// "I Have Paid" on the QRIS screen. Payment is taken on trust (simulation);
/// confirming submits the order.
pub async fn confirm_payment(app: &tauri::AppHandle) -> Result<Wizard, String> {
    finalize_order(app, WizardStep::Payment).await
}

/// Submit the order and, on acceptance, snapshot the receipt and clear the
/// cart. On failure everything stays as it was.
async fn finalize_order(app: &tauri::AppHandle, from_step: WizardStep) -> Result<Wizard, String> {
    let checkout = app.state::<CheckoutState>();
    let cart = app.state::<CartState>();
    let session = app.state::<SessionState>();
    let config = app.state::<ConfigState>();

    checkout.require_step(from_step)?;
    let lines = cart.lines();
    if lines.is_empty() {
        return Err("Cart is empty".to_string());
    }

    let totals = totals(&lines);
    let user = session.current_user();
    let settings = config.snapshot();
    let (client_order_id, method) = checkout.finalize_context();

    let payload = build_order_payload(&lines, &totals, method, user.as_ref(), &client_order_id);
    info!(
        order_id = %client_order_id,
        method = method.as_str(),
        total = round2(totals.total),
        "submitting order"
    );

    let outcome = api::post_json(&settings.backend_url, "/api/orders", Some(payload))
        .await
        .map(|response| extract_server_order_id(&response));

    let (final_id, tolerated) =
        resolve_order_id(outcome, &client_order_id, settings.demo_mode).map_err(|err| {
            warn!(order_id = %client_order_id, error = %err, "order submission failed");
            err
        })?;
    if tolerated {
        warn!(
            order_id = %final_id,
            "backend unreachable, demo mode completed the order locally"
        );
    }

    let cashier = user.map(|u| u.name);
    let wizard = checkout.complete_order(final_id.clone(), lines, &totals, cashier);
    cart.clear();

    let _ = app.emit(
        EVENT_ORDER_CREATED,
        json!({
            "orderId": final_id,
            "total": round2(totals.total),
            "paymentMethod": method,
            "timestamp": Utc::now().to_rfc3339(),
        }),
    );
    info!(order_id = %final_id, "order completed");

    Ok(wizard)
}

/// Ask the backend to mail the receipt for the completed order.
pub async fn email_receipt(app: &tauri::AppHandle) -> Result<Value, String> {
    let checkout = app.state::<CheckoutState>();
    checkout.require_step(WizardStep::Receipt)?;
    let order_id = checkout
        .wizard()
        .order_id
        .ok_or_else(|| "No completed order".to_string())?;

    let backend_url = app.state::<ConfigState>().backend_url();
    api::post_json(
        &backend_url,
        &format!("/api/orders/{order_id}/send-receipt"),
        None,
    )
    .await
    .map_err(|e| e.to_string())?;

    info!(order_id = %order_id, "receipt email requested");
    Ok(json!({ "success": true, "orderId": order_id }))
}
