//! Runtime configuration, read from the process environment.
//!
//! Every setting has a default so the client works against a local admin API
//! with no environment at all. Unparsable values are rejected rather than
//! silently replaced.

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::info;

use crate::api::normalize_admin_url;
use crate::error::AdminError;
use crate::list_query::ResponseOrdering;
use crate::pricing::GrandTotalFallback;

pub const DEFAULT_API_ORIGIN: &str = "http://localhost:8000";
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub const PRODUCTS_PATH: &str = "/api/admin/getproducts";
pub const ORDERS_PATH: &str = "/api/admin/getorders";

#[derive(Debug, Clone, PartialEq)]
pub struct AdminConfig {
    /// Normalized origin, no trailing slash and no `/api` suffix.
    pub api_origin: String,
    pub request_timeout: Duration,
    pub search_debounce: Duration,
    pub default_page_size: u32,
    pub response_ordering: ResponseOrdering,
    pub grand_total_fallback: GrandTotalFallback,
    pub log_dir: PathBuf,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            api_origin: DEFAULT_API_ORIGIN.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            search_debounce: DEFAULT_SEARCH_DEBOUNCE,
            default_page_size: DEFAULT_PAGE_SIZE,
            response_ordering: ResponseOrdering::default(),
            grand_total_fallback: GrandTotalFallback::default(),
            log_dir: default_log_dir(),
        }
    }
}

impl AdminConfig {
    pub fn from_env() -> Result<Self, AdminError> {
        let origin: String = try_load("ADMIN_API_ORIGIN", DEFAULT_API_ORIGIN)?;
        let api_origin = normalize_admin_url(&origin);
        if api_origin.len() <= "https://".len() {
            return Err(AdminError::Config(format!(
                "ADMIN_API_ORIGIN is not a usable URL: {origin:?}"
            )));
        }

        let timeout_secs: u64 = try_load("ADMIN_REQUEST_TIMEOUT_SECS", "30")?;
        let debounce_ms: u64 = try_load("ADMIN_SEARCH_DEBOUNCE_MS", "500")?;
        let page_size: u32 = try_load("ADMIN_PAGE_SIZE", "10")?;
        if page_size == 0 {
            return Err(AdminError::Config(
                "ADMIN_PAGE_SIZE must be greater than zero".into(),
            ));
        }

        let log_dir = match env::var("ADMIN_LOG_DIR") {
            Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir.trim()),
            _ => default_log_dir(),
        };

        Ok(Self {
            api_origin,
            request_timeout: Duration::from_secs(timeout_secs),
            search_debounce: Duration::from_millis(debounce_ms),
            default_page_size: page_size,
            response_ordering: try_load("ADMIN_RESPONSE_ORDERING", "latest-issued")?,
            grand_total_fallback: try_load("ADMIN_GRAND_TOTAL_FALLBACK", "subtract-discount")?,
            log_dir,
        })
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, AdminError>
where
    T::Err: Display,
{
    let raw = match env::var(key) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => {
            info!("{key} not set, using default: {default}");
            default.to_string()
        }
    };
    raw.trim()
        .parse()
        .map_err(|e| AdminError::Config(format!("Invalid {key} value {raw:?}: {e}")))
}

/// Platform data directory for log files.
pub fn default_log_dir() -> PathBuf {
    let base = env::var("LOCALAPPDATA")
        .or_else(|_| env::var("XDG_DATA_HOME"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            #[cfg(target_os = "windows")]
            {
                PathBuf::from(env::var("USERPROFILE").unwrap_or_else(|_| ".".into()))
                    .join("AppData")
                    .join("Local")
            }
            #[cfg(not(target_os = "windows"))]
            {
                PathBuf::from(env::var("HOME").unwrap_or_else(|_| ".".into()))
                    .join(".local")
                    .join("share")
            }
        });
    base.join("food-admin").join("logs")
}
