//! XDG-compliant log and config directory management
//!
//! Logs are stored in `$XDG_STATE_HOME/crater/logs/` (typically
//! `~/.local/state/crater/logs/`). Each run writes a PID-named log file so
//! several browsers can run side by side; log files older than a day are
//! removed on startup.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::{Duration, SystemTime};

/// Minimum age for log files to be cleaned up (24 hours)
const CLEANUP_AGE: Duration = Duration::from_secs(24 * 60 * 60);

const APP_DIR: &str = "crater";

/// Cached log directory path
static LOG_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Get the base log directory, creating it if necessary.
///
/// Falls back to the system temp directory when the XDG location cannot be
/// created.
pub fn log_dir() -> &'static PathBuf {
    LOG_DIR.get_or_init(|| {
        let fallback = std::env::temp_dir().join("crater-logs");
        let dir = get_xdg_log_dir().unwrap_or_else(|| fallback.clone());

        if let Err(e) = fs::create_dir_all(&dir) {
            tracing::warn!("Failed to create log directory {:?}: {}", dir, e);
            return fallback;
        }

        dir
    })
}

/// Get the XDG state home log directory
fn get_xdg_log_dir() -> Option<PathBuf> {
    if let Ok(state_home) = std::env::var("XDG_STATE_HOME") {
        let path = PathBuf::from(state_home);
        if path.is_absolute() {
            return Some(path.join(APP_DIR).join("logs"));
        }
    }

    dirs::home_dir().map(|home| {
        home.join(".local")
            .join("state")
            .join(APP_DIR)
            .join("logs")
    })
}

/// Path of the log file for this process: `{log_dir}/crater-tree-{PID}.log`
pub fn main_log_path() -> PathBuf {
    log_dir().join(format!("crater-tree-{}.log", std::process::id()))
}

/// Directory holding the user config (`~/.config/crater`)
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR))
}

/// Default config file location (`~/.config/crater/tree.json`)
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("tree.json"))
}

/// Remove log files of earlier runs that are older than a day
pub fn cleanup_stale_logs() {
    cleanup_stale_logs_in_dir(log_dir(), std::process::id());
}

fn cleanup_stale_logs_in_dir(dir: &Path, current_pid: u32) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();

        if !name.ends_with(".log") {
            continue;
        }

        if extract_pid_from_filename(&name) == Some(current_pid) {
            continue;
        }

        if entry.file_type().map(|t| t.is_file()).unwrap_or(false)
            && is_file_older_than(&entry.path(), CLEANUP_AGE)
        {
            if let Err(e) = fs::remove_file(entry.path()) {
                tracing::debug!("Failed to clean up stale log {:?}: {}", entry.path(), e);
            } else {
                tracing::debug!("Cleaned up stale log file: {:?}", entry.path());
            }
        }
    }
}

/// Check if a file is older than the specified duration
fn is_file_older_than(path: &Path, age: Duration) -> bool {
    let Ok(metadata) = fs::metadata(path) else {
        return false;
    };

    let Ok(modified) = metadata.modified() else {
        return false;
    };

    SystemTime::now()
        .duration_since(modified)
        .map(|elapsed| elapsed > age)
        .unwrap_or(false)
}

/// Extract PID from a filename like "crater-tree-12345.log"
fn extract_pid_from_filename(name: &str) -> Option<u32> {
    let without_ext = name.strip_suffix(".log")?;
    let last_hyphen = without_ext.rfind('-')?;
    without_ext[last_hyphen + 1..].parse().ok()
}

/// Print the directories used by the browser to stdout
pub fn print_all_paths() {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    let config = default_config_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<unavailable>".to_string());

    writeln!(handle, "Crater file tree directories:").ok();
    writeln!(handle).ok();
    writeln!(handle, "Config:     {}", config).ok();
    writeln!(handle, "Logs:       {}", log_dir().display()).ok();
    writeln!(handle, "  this run:   {}", main_log_path().display()).ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_extract_pid_from_filename() {
        assert_eq!(extract_pid_from_filename("crater-tree-12345.log"), Some(12345));
        assert_eq!(extract_pid_from_filename("crater-tree.log"), None);
        assert_eq!(extract_pid_from_filename("notes.txt"), None);
    }

    #[test]
    fn test_fresh_logs_are_kept() {
        let temp_dir = TempDir::new().unwrap();
        let log = temp_dir.path().join("crater-tree-1.log");
        fs::write(&log, "old run").unwrap();

        cleanup_stale_logs_in_dir(temp_dir.path(), 2);

        // Written just now, so younger than the cleanup age
        assert!(log.exists());
    }

    #[test]
    fn test_is_file_older_than_missing_file() {
        assert!(!is_file_older_than(
            Path::new("/definitely/not/here.log"),
            Duration::ZERO
        ));
    }
}
