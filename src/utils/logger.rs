use anyhow::{Context, Result};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const LOG_FILE_PREFIX: &str = "domain_spider_";
const LOG_FILE_SUFFIX: &str = ".log";

/// Installs the global tracing subscriber writing to a timestamped file.
///
/// The filter comes from `RUST_LOG` and defaults to `info`. Log files in
/// `log_dir` older than `max_age_days` are removed first; zero keeps all.
///
/// # Returns
/// * `Result<PathBuf>` - Path of the new log file
pub fn init_logger(log_dir: &Path, max_age_days: u64) -> Result<PathBuf> {
    // Create log directory if it doesn't exist
    fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

    let removed = prune_old_logs(log_dir, max_age_days)?;

    // Create log file with timestamp
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let log_file = log_dir.join(format!("{}{}{}", LOG_FILE_PREFIX, timestamp, LOG_FILE_SUFFIX));
    let file = fs::File::create(&log_file)
        .with_context(|| format!("Failed to create log file: {}", log_file.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Initialize tracing subscriber
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;
    info!("Logger initialized at {}", log_file.display());
    if removed > 0 {
        debug!("Removed {} expired log files", removed);
    }

    Ok(log_file)
}

/// Deletes this program's log files last modified more than `max_age_days` ago.
///
/// # Returns
/// * `Result<usize>` - Number of files removed
pub fn prune_old_logs(log_dir: &Path, max_age_days: u64) -> Result<usize> {
    if max_age_days == 0 {
        return Ok(0);
    }
    let max_age = Duration::from_secs(max_age_days.saturating_mul(24 * 60 * 60));
    let now = SystemTime::now();
    let mut removed = 0;

    let entries = fs::read_dir(log_dir)
        .with_context(|| format!("Failed to read log directory: {}", log_dir.display()))?;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.starts_with(LOG_FILE_PREFIX) || !name.ends_with(LOG_FILE_SUFFIX) {
            continue;
        }

        let expired = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .map_or(false, |age| age > max_age);
        if expired {
            match fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to remove old log {}: {}", entry.path().display(), e),
            }
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prune_keeps_fresh_and_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let fresh = dir.path().join("domain_spider_20260101_000000.log");
        let foreign = dir.path().join("other.log");
        fs::write(&fresh, "x").unwrap();
        fs::write(&foreign, "x").unwrap();

        assert_eq!(prune_old_logs(dir.path(), 7).unwrap(), 0);
        assert!(fresh.exists());
        assert!(foreign.exists());
    }

    #[test]
    fn test_prune_removes_expired() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("domain_spider_20200101_000000.log");
        fs::write(&old, "x").unwrap();
        let ten_days_ago = SystemTime::now() - Duration::from_secs(10 * 24 * 60 * 60);
        fs::File::options()
            .write(true)
            .open(&old)
            .unwrap()
            .set_modified(ten_days_ago)
            .unwrap();

        assert_eq!(prune_old_logs(dir.path(), 7).unwrap(), 1);
        assert!(!old.exists());
    }

    #[test]
    fn test_zero_max_age_keeps_everything() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(prune_old_logs(dir.path().join("missing").as_path(), 0).unwrap(), 0);
    }
}
