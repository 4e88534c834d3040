//! Structured logging: console plus a daily rolling file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::AdminConfig;
use crate::error::AdminError;

pub const MAX_LOG_FILES: usize = 10;
pub const LOG_FILE_PREFIX: &str = "food-admin";
const DEFAULT_FILTER: &str = "info,food_admin_lib=debug";

/// Install the global subscriber. The returned guard flushes the file
/// writer on drop and must live as long as the process logs.
pub fn init_logging(config: &AdminConfig) -> Result<WorkerGuard, AdminError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    fs::create_dir_all(&config.log_dir).map_err(|e| {
        AdminError::Config(format!(
            "Cannot create log directory {}: {e}",
            config.log_dir.display()
        ))
    })?;
    let pruned = prune_old_logs(&config.log_dir, MAX_LOG_FILES);

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // File output is JSON lines so it can be shipped as-is.
    let file_layer = fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);
    let console_layer = fmt::layer().with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| AdminError::Config(format!("Logging already initialized: {e}")))?;

    info!(log_dir = %config.log_dir.display(), pruned, "logging initialized");
    Ok(guard)
}

/// Delete all but the `keep` most recently modified log files in `dir`.
/// Returns how many were removed.
pub fn prune_old_logs(dir: &Path, keep: usize) -> usize {
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };

    let mut log_files: Vec<(PathBuf, SystemTime)> = entries
        .flatten()
        .filter(|entry| entry.path().is_file())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(&format!("{LOG_FILE_PREFIX}.")))
        })
        .map(|entry| {
            let modified = entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (entry.path(), modified)
        })
        .collect();

    // Newest first
    log_files.sort_by(|a, b| b.1.cmp(&a.1));

    let mut removed = 0;
    for (path, _) in log_files.iter().skip(keep) {
        match fs::remove_file(path) {
            Ok(()) => removed += 1,
            Err(e) => warn!("Failed to prune log file {}: {e}", path.display()),
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("food-admin-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn touch(dir: &Path, name: &str, age_days: u64) {
        let file = File::create(dir.join(name)).unwrap();
        let mtime = SystemTime::now() - Duration::from_secs(age_days * 86_400);
        file.set_modified(mtime).unwrap();
    }

    #[test]
    fn test_prune_keeps_newest_log_files() {
        let dir = scratch_dir("prune");
        for day in 0..13 {
            touch(&dir, &format!("food-admin.2026-10-{:02}", 19 - day), day);
        }
        touch(&dir, "notes.txt", 100);

        assert_eq!(prune_old_logs(&dir, MAX_LOG_FILES), 3);

        let mut left: Vec<String> = fs::read_dir(&dir)
            .unwrap()
            .flatten()
            .filter_map(|e| e.file_name().into_string().ok())
            .collect();
        left.sort();
        assert_eq!(left.len(), 11);
        assert!(left.contains(&"notes.txt".to_string()));
        assert!(left.contains(&"food-admin.2026-10-19".to_string()));
        assert!(!left.contains(&"food-admin.2026-10-07".to_string()));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_prune_missing_dir_is_noop() {
        let dir = std::env::temp_dir().join("food-admin-does-not-exist-7c1f");
        assert_eq!(prune_old_logs(&dir, MAX_LOG_FILES), 0);
    }
}
