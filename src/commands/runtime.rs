//! Runtime metadata commands.

// ---------- Commands ----------

#[tauri::command]
pub async fn app_get_version() -> Result<serde_json::Value, String> {
    Ok(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "buildTimestamp": env!("BUILD_TIMESTAMP"),
        "gitSha": env!("BUILD_GIT_SHA"),
    }))
}

#[cfg(test)]
mod dto_tests {
    #[test]
    fn version_matches_package_metadata() {
        assert_eq!(env!("CARGO_PKG_VERSION"), "0.9.2");
        assert!(!env!("BUILD_TIMESTAMP").is_empty());
    }
}
