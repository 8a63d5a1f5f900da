//! Centralized path resolution for bunnyform
//!
//! # Environment Variables
//!
//! - `BUNNYFORM_CONFIG_DIR` - Override config directory (e.g., `~/infra/bunny`)
//! - `BUNNYFORM_STATE_DIR` - Override state directory
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `BUNNYFORM_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/bunnyform` (if set)
//! 3. Platform default:
//!    - Windows: `%APPDATA%\bunnyform`
//!    - macOS/Linux: `~/.config/bunnyform`
//!
//! For state_dir():
//! 1. `BUNNYFORM_STATE_DIR` environment variable
//! 2. `XDG_STATE_HOME/bunnyform` (if set)
//! 3. Platform default:
//!    - Windows: `%LOCALAPPDATA%\bunnyform`
//!    - macOS/Linux: `~/.local/state/bunnyform`

use anyhow::{Context, Result};
use std::path::PathBuf;

const APP_DIR: &str = "bunnyform";

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "BUNNYFORM_CONFIG_DIR";

/// Environment variable for state directory override
pub const ENV_STATE_DIR: &str = "BUNNYFORM_STATE_DIR";

/// One kind of directory and where to look for it
struct DirKind {
    name: &'static str,
    override_var: &'static str,
    xdg_var: &'static str,
    #[cfg_attr(not(windows), allow(dead_code))]
    platform: fn() -> Option<PathBuf>,
    /// Below the home directory when nothing else applies
    home_default: &'static [&'static str],
}

const CONFIG: DirKind = DirKind {
    name: "config",
    override_var: ENV_CONFIG_DIR,
    xdg_var: "XDG_CONFIG_HOME",
    platform: dirs::config_dir,
    home_default: &[".config"],
};

const STATE: DirKind = DirKind {
    name: "state",
    override_var: ENV_STATE_DIR,
    xdg_var: "XDG_STATE_HOME",
    platform: dirs::data_local_dir,
    home_default: &[".local", "state"],
};

fn resolve(kind: &DirKind) -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(kind.override_var) {
        let path = expand(&dir);
        log::debug!("Using {} dir from {}: {}", kind.name, kind.override_var, path.display());
        return Ok(path);
    }

    if let Ok(xdg) = std::env::var(kind.xdg_var) {
        let path = PathBuf::from(xdg).join(APP_DIR);
        log::debug!("Using {}: {}", kind.xdg_var, path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(base) = (kind.platform)() {
            let path = base.join(APP_DIR);
            log::debug!("Using Windows {} dir: {}", kind.name, path.display());
            return Ok(path);
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = kind
        .home_default
        .iter()
        .fold(home, |path, segment| path.join(segment))
        .join(APP_DIR);
    log::debug!("Using default {} dir: {}", kind.name, path.display());
    Ok(path)
}

/// Get the bunnyform config directory path
pub fn config_dir() -> Result<PathBuf> {
    resolve(&CONFIG)
}

/// Get the bunnyform state directory path
pub fn state_dir() -> Result<PathBuf> {
    resolve(&STATE)
}

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables are left as written.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================
