#![recursion_limit = "256"]

//! CaffeRine POS - Tauri v2 Backend
//!
//! This module registers all IPC command handlers that the React storefront
//! calls via `@tauri-apps/api/core::invoke()`. Command names use snake_case
//! derived from the frontend feature areas (e.g. `cart:addItem` -> `cart_add_item`).

use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod cart;
mod catalog;
mod checkout;
mod commands;
mod config;
mod session;

/// Maximum number of log files to retain.
const MAX_LOG_FILES: usize = 10;

fn get_log_dir() -> PathBuf {
    let base = std::env::var("LOCALAPPDATA")
        .or_else(|_| std::env::var("XDG_DATA_HOME"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            #[cfg(target_os = "windows")]
            {
                PathBuf::from(std::env::var("USERPROFILE").unwrap_or_else(|_| ".".into()))
                    .join("AppData")
                    .join("Local")
            }
            #[cfg(not(target_os = "windows"))]
            {
                PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()))
                    .join(".local")
                    .join("share")
            }
        });
    base.join("com.cafferine.pos").join("logs")
}

/// Prune old log files, keeping only the most recent `MAX_LOG_FILES`.
fn prune_old_logs() {
    let log_dir = get_log_dir();
    if !log_dir.exists() {
        return;
    }

    let mut log_files: Vec<(PathBuf, std::time::SystemTime)> = Vec::new();
    if let Ok(entries) = std::fs::read_dir(&log_dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    if name.starts_with("cafferine.") || name == "cafferine.log" {
                        let modified = entry
                            .metadata()
                            .ok()
                            .and_then(|m| m.modified().ok())
                            .unwrap_or(std::time::UNIX_EPOCH);
                        log_files.push((path, modified));
                    }
                }
            }
        }
    }

    // Sort newest first
    log_files.sort_by(|a, b| b.1.cmp(&a.1));

    for (path, _) in log_files.iter().skip(MAX_LOG_FILES) {
        if let Err(e) = std::fs::remove_file(path) {
            warn!("Failed to prune log file {}: {e}", path.display());
        }
    }
}

// ============================================================================
// App entry point
// ============================================================================

pub fn run() {
    // Initialize structured logging (console + rolling file)
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,cafferine_pos_lib=debug"));

    // Prune old log files before setting up the appender
    prune_old_logs();

    // Rolling file appender: creates daily log files in the logs directory
    let log_dir = get_log_dir();
    std::fs::create_dir_all(&log_dir).ok();

    let file_appender = tracing_appender::rolling::daily(&log_dir, "cafferine");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);
    let console_layer = fmt::layer().with_target(true);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    // Leak the guard so buffered log writes keep flushing until process exit.
    std::mem::forget(_guard);

    info!("Starting CaffeRine POS v{}", env!("CARGO_PKG_VERSION"));

    tauri::Builder::default()
        .setup(|app| {
            use tauri::Manager;

            // Runtime settings come from the environment; everything else is
            // in-memory session state owned by the webview lifetime.
            let config_state = config::ConfigState::from_env();
            app.manage(config_state);
            app.manage(cart::CartState::default());
            app.manage(session::SessionState::default());
            app.manage(catalog::CatalogState::default());
            app.manage(checkout::CheckoutState::default());

            info!("Config, cart, session, catalog, and checkout state registered");
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            // App lifecycle
            commands::runtime::app_get_version,
            // Cart
            commands::cart::cart_get_state,
            commands::cart::cart_add_item,
            commands::cart::cart_remove_item,
            commands::cart::cart_clear,
            // Session
            commands::session::session_set_user,
            commands::session::session_get_user,
            // Catalog
            commands::catalog::catalog_get_products,
            commands::catalog::catalog_get_categories,
            commands::catalog::catalog_refresh,
            commands::catalog::catalog_get_product_detail,
            commands::catalog::catalog_get_heroes,
            commands::catalog::catalog_start_polling,
            commands::catalog::catalog_stop_polling,
            commands::catalog::catalog_get_poll_status,
            // Checkout
            commands::checkout::checkout_get_state,
            commands::checkout::checkout_set_payment_method,
            commands::checkout::checkout_process_payment,
            commands::checkout::checkout_confirm_payment,
            commands::checkout::checkout_back_to_cart,
            commands::checkout::checkout_new_transaction,
            commands::checkout::receipt_email,
            commands::checkout::receipt_print,
            // Settings
            commands::settings::settings_get,
            commands::settings::settings_set_backend_url,
            commands::settings::settings_set_demo_mode,
        ])
        .run(tauri::generate_context!())
        .expect("error while running CaffeRine POS");
}
