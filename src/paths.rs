use anyhow::{Context, Result};
use directories::BaseDirs;
use std::path::{Path, PathBuf};

/// Live settings file consumed by Claude Code.
pub const SETTINGS_FILE: &str = "settings.json";
/// Plain-text state file holding the active profile name.
pub const ACTIVE_STATE_FILE: &str = "settings.json.active";
/// Directory of stored profiles.
pub const STORE_DIR: &str = "switch-settings";
/// Directory of content-addressed backups.
pub const BACKUP_DIR: &str = "switch-settings-backup";
/// Extension shared by profiles and backups.
pub const PROFILE_EXT: &str = "json";

/// All computed paths used by ccswitch.
#[derive(Debug, Clone)]
pub struct Paths {
    /// ~/.claude
    pub base_dir: PathBuf,
    /// ~/.claude/settings.json
    pub live_settings: PathBuf,
    /// ~/.claude/settings.json.active
    pub active_state: PathBuf,
    /// ~/.claude/switch-settings
    pub store_dir: PathBuf,
    /// ~/.claude/switch-settings-backup
    pub backup_dir: PathBuf,
}

impl Paths {
    pub fn new() -> Result<Self> {
        let base_dirs = BaseDirs::new().context("Failed to determine home directory")?;
        Ok(Self::with_root(base_dirs.home_dir().join(".claude")))
    }

    /// Build paths under an explicit root directory instead of the home
    /// directory. Tests use this with a temp dir.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let base_dir = root.into();
        Self {
            live_settings: base_dir.join(SETTINGS_FILE),
            active_state: base_dir.join(ACTIVE_STATE_FILE),
            store_dir: base_dir.join(STORE_DIR),
            backup_dir: base_dir.join(BACKUP_DIR),
            base_dir,
        }
    }

    /// Check if a path is within the settings store.
    pub fn is_in_store(&self, path: &Path) -> bool {
        path.starts_with(&self.store_dir)
    }
}
