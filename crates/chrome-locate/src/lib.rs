//! # chrome-locate
//!
//! Pick the Chrome or Chromium executable a chromiumoxide session should
//! launch.
//!
//! ## Resolution order
//!
//! On [`locate_chrome`]:
//!
//! 1. `CHROME_PATH`: an explicit path. If it is set but the file is missing
//!    that is an error; a typo should not silently fall back to another build.
//! 2. chromiumoxide's own detection: the `CHROME` variable, executable names
//!    on `PATH`, the platform install locations and, on Windows, the registry.
//!
//! The result is cached for the life of the process.
//!
//! ## Usage
//!
//! ```rust,no_run
//! let chrome = chrome_locate::locate_chrome().expect("no Chrome install found");
//! println!("launching {}", chrome.display());
//! ```

use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::OnceLock;

use chromiumoxide::detection::{default_executable, DetectionOptions};
use thiserror::Error;

// ── Public constants ─────────────────────────────────────────────────────────

/// Environment variable holding an explicit browser executable path.
pub const CHROME_PATH_ENV: &str = "CHROME_PATH";

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned by chrome-locate.
#[derive(Error, Debug)]
pub enum ChromeLocateError {
    /// `CHROME_PATH` points at something that is not a file.
    #[error("CHROME_PATH is set to '{path}' but no file exists there")]
    EnvPathMissing { path: PathBuf },

    /// Detection found nothing usable.
    #[error(
        "No Chrome or Chromium executable found: {reason}\n\
Install Google Chrome or Chromium, or set CHROME_PATH=/path/to/chrome."
    )]
    NotFound { reason: String },
}

// ── Thread-safe singleton path cache ─────────────────────────────────────────

static RESOLVED_PATH: OnceLock<PathBuf> = OnceLock::new();

// ── Public API ───────────────────────────────────────────────────────────────

/// Locate a browser executable for the current machine.
///
/// See the crate docs for the resolution order. Safe to call from multiple
/// threads; detection runs at most once per successful lookup.
pub fn locate_chrome() -> Result<PathBuf, ChromeLocateError> {
    if let Some(path) = RESOLVED_PATH.get() {
        return Ok(path.clone());
    }

    let env_override = override_from(std::env::var_os(CHROME_PATH_ENV));
    let path = locate_chrome_in(env_override, || {
        default_executable(DetectionOptions::default())
    })?;
    let _ = RESOLVED_PATH.set(path.clone());
    Ok(path)
}

/// Resolve against an explicit override and a detection fallback.
///
/// Does not read the environment; `detect` runs only without an override.
pub fn locate_chrome_in<F>(
    env_override: Option<PathBuf>,
    detect: F,
) -> Result<PathBuf, ChromeLocateError>
where
    F: FnOnce() -> Result<PathBuf, String>,
{
    if let Some(path) = env_override {
        if path.is_file() {
            return Ok(path);
        }
        return Err(ChromeLocateError::EnvPathMissing { path });
    }

    detect().map_err(|reason| ChromeLocateError::NotFound { reason })
}

/// An empty variable counts as unset.
fn override_from(value: Option<OsString>) -> Option<PathBuf> {
    value.filter(|v| !v.is_empty()).map(PathBuf::from)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn override_wins_without_detection() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("my-chrome");
        File::create(&fake).unwrap();

        let found = locate_chrome_in(Some(fake.clone()), || panic!("detection ran")).unwrap();
        assert_eq!(found, fake);
    }

    #[test]
    fn missing_override_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let other = dir.path().join("chromium");
        File::create(&other).unwrap();

        let err = locate_chrome_in(Some(dir.path().join("nope")), || Ok(other)).unwrap_err();
        assert!(matches!(err, ChromeLocateError::EnvPathMissing { .. }));
    }

    #[test]
    fn detection_result_is_used_without_override() {
        let detected = PathBuf::from("/opt/google/chrome/chrome");
        let found = locate_chrome_in(None, || Ok(detected.clone())).unwrap();
        assert_eq!(found, detected);
    }

    #[test]
    fn detection_failure_keeps_its_reason() {
        match locate_chrome_in(None, || Err("nothing on PATH".to_string())) {
            Err(ChromeLocateError::NotFound { reason }) => assert_eq!(reason, "nothing on PATH"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn empty_variable_is_unset() {
        assert_eq!(override_from(Some(OsString::new())), None);
        assert_eq!(override_from(None), None);
        assert_eq!(
            override_from(Some(OsString::from("/usr/bin/chromium"))),
            Some(PathBuf::from("/usr/bin/chromium"))
        );
    }
}
