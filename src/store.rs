//! Profile store: stored settings files plus the active pointer.
//!
//! The active pointer is a plain-text state file holding the name of the
//! profile currently in effect, or nothing. A pointer that names a profile
//! which no longer exists is a first-class state (`ActiveMissing`), not an
//! error: the user may have removed the file out of band.

use std::fs;
use std::path::{Path, PathBuf};

use crate::backup::Fingerprint;
use crate::paths::PROFILE_EXT;
use crate::storage::{Storage, StorageError};

/// Status of one entry in the profile listing. Exactly five states are
/// reachable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileStatus {
    /// Stored, not the active pointer.
    Inactive,
    /// Stored and named by the active pointer; `modified` when the live
    /// file has diverged from the stored copy.
    Active { modified: bool },
    /// Named by the active pointer but no longer present in the store.
    ActiveMissing,
    /// No active pointer, but the live file has content that was never
    /// saved as a profile.
    Unsaved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileEntry {
    /// Profile name; empty for the synthetic `Unsaved` entry.
    pub name: String,
    pub status: ProfileStatus,
}

/// Enumerates stored profiles and tracks the active pointer.
pub struct ProfileStore {
    storage: Storage,
    store_dir: PathBuf,
    active_state: PathBuf,
}

impl ProfileStore {
    pub fn new(storage: Storage, store_dir: PathBuf, active_state: PathBuf) -> Self {
        Self {
            storage,
            store_dir,
            active_state,
        }
    }

    /// The currently active profile name, or empty if unset or unreadable.
    pub fn active_name(&self) -> String {
        fs::read_to_string(&self.active_state)
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    }

    /// Persist the active pointer. An empty name clears it.
    pub fn set_active(&self, name: &str) -> Result<(), StorageError> {
        self.storage.write_file(&self.active_state, name.as_bytes())
    }

    /// Path of the stored settings file for `name`.
    pub fn stored_path(&self, name: &str) -> PathBuf {
        self.store_dir.join(format!("{name}.{PROFILE_EXT}"))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.stored_path(name).is_file()
    }

    /// Names of all stored profiles, sorted lexicographically.
    pub fn list_stored(&self) -> Result<Vec<String>, StorageError> {
        let entries = fs::read_dir(&self.store_dir)
            .map_err(|e| StorageError::io("read settings store", &self.store_dir, e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|e| StorageError::io("read settings store", &self.store_dir, e))?;
            let path = entry.path();
            let file_type = entry
                .file_type()
                .map_err(|e| StorageError::io("stat", &path, e))?;
            if file_type.is_dir() {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(PROFILE_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Compute the status-annotated listing.
    ///
    /// The result is a pure function of the active pointer, the stored
    /// names, and the fingerprints of the live file and the active stored
    /// file. `fingerprint` is injected so callers decide how content
    /// identity is computed.
    pub fn list_entries<F>(
        &self,
        live_path: &Path,
        fingerprint: F,
    ) -> Result<Vec<ProfileEntry>, StorageError>
    where
        F: Fn(&Path) -> Result<Fingerprint, StorageError>,
    {
        let active = self.active_name();
        let live = fingerprint(live_path)?;
        let names = self.list_stored()?;

        let mut entries = Vec::with_capacity(names.len() + 1);
        let mut active_seen = false;
        for name in names {
            let status = if name == active {
                active_seen = true;
                let stored = fingerprint(&self.stored_path(&name))?;
                let modified = live != Fingerprint::Absent
                    && stored != Fingerprint::Absent
                    && live != stored;
                ProfileStatus::Active { modified }
            } else {
                ProfileStatus::Inactive
            };
            entries.push(ProfileEntry { name, status });
        }

        if !active.is_empty() && !active_seen {
            // Dangling pointer: the named profile was removed out of band.
            entries.push(ProfileEntry {
                name: active,
                status: ProfileStatus::ActiveMissing,
            });
        } else if active.is_empty() && matches!(live, Fingerprint::Digest(_)) {
            entries.push(ProfileEntry {
                name: String::new(),
                status: ProfileStatus::Unsaved,
            });
        }

        Ok(entries)
    }
}
