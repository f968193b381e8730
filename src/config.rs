use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Labsight";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the application data directory
/// ~/Labsight/ on all platforms (user-visible, holds the insights DB)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Labsight")
}

/// Insights database path, overridable via `LABSIGHT_DB`.
pub fn default_db_path() -> PathBuf {
    std::env::var("LABSIGHT_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|_| app_data_dir().join("insights.db"))
}

/// HTTP bind address, overridable via `LABSIGHT_ADDR`.
pub fn bind_addr() -> String {
    std::env::var("LABSIGHT_ADDR").unwrap_or_else(|_| "127.0.0.1:7460".to_string())
}

/// Analysis engine base URL, overridable via `ANALYSIS_ENGINE_URL`.
pub fn analysis_engine_url() -> String {
    std::env::var("ANALYSIS_ENGINE_URL").unwrap_or_else(|_| "http://localhost:8000".to_string())
}

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "labsight=info,tower_http=info"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_under_home() {
        let dir = app_data_dir();
        let home = dirs::home_dir().unwrap();
        assert!(dir.starts_with(home));
        assert!(dir.ends_with("Labsight"));
    }

    #[test]
    fn app_name_is_labsight() {
        assert_eq!(APP_NAME, "Labsight");
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }
}
