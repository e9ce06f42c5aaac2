//! Orchestration of the state-changing operations.
//!
//! `use_profile` and `save` are sequences of individually-atomic steps:
//! validate, back up the file about to be overwritten, copy, persist the
//! active pointer. A failed step stops the sequence without rolling back
//! completed ones; every intermediate state is one the system could also
//! have reached normally.

use std::time::Duration;

use thiserror::Error;
use tracing::info;

use crate::backup::{BackupEngine, Clock};
use crate::paths::Paths;
use crate::storage::{Storage, StorageError};
use crate::store::{ProfileEntry, ProfileStore};
use crate::validate::{self, NameError};

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid profile name: {0}")]
    InvalidName(#[from] NameError),

    #[error("settings '{0}' not found")]
    ProfileNotFound(String),

    #[error("settings.json not found, nothing to save")]
    NothingToSave,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Composes the validator, storage, backup engine, and profile store.
pub struct Manager {
    paths: Paths,
    storage: Storage,
    backups: BackupEngine,
    store: ProfileStore,
}

impl Manager {
    pub fn new(paths: Paths) -> Self {
        Self::with_parts(paths, Storage::new(), crate::backup::system_clock())
    }

    /// Constructor with an explicit clock, for deterministic tests.
    pub fn with_clock(paths: Paths, clock: Clock) -> Self {
        Self::with_parts(paths, Storage::new(), clock)
    }

    /// Constructor with explicit storage and clock, for callers that need
    /// a different symlink capability or a fixed time source.
    pub fn with_parts(paths: Paths, storage: Storage, clock: Clock) -> Self {
        let backups =
            BackupEngine::with_clock(storage.clone(), paths.backup_dir.clone(), clock);
        let store = ProfileStore::new(
            storage.clone(),
            paths.store_dir.clone(),
            paths.active_state.clone(),
        );
        Self {
            paths,
            storage,
            backups,
            store,
        }
    }

    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    pub fn backups(&self) -> &BackupEngine {
        &self.backups
    }

    /// Create the store and backup directories if missing (owner-only).
    fn init_dirs(&self) -> Result<(), StorageError> {
        self.storage.ensure_dir(&self.paths.store_dir)?;
        self.storage.ensure_dir(&self.paths.backup_dir)
    }

    /// Activate a stored profile: back up the live file, copy the stored
    /// profile over it, persist the pointer. Returns the normalized name.
    pub fn use_profile(&self, name: &str) -> Result<String, Error> {
        self.init_dirs()?;
        let name = validate::normalize_name(name)?;
        if !self.store.exists(&name) {
            return Err(Error::ProfileNotFound(name));
        }
        self.backups.backup(&self.paths.live_settings)?;
        self.storage
            .copy_file(&self.store.stored_path(&name), &self.paths.live_settings)?;
        self.store.set_active(&name)?;
        info!(profile = %name, "activated settings profile");
        Ok(name)
    }

    /// Persist the live file as a named profile and activate that name.
    /// The stored profile about to be overwritten (if any) is backed up
    /// first. Returns the normalized name.
    pub fn save(&self, target_name: &str) -> Result<String, Error> {
        self.init_dirs()?;
        if !self.paths.live_settings.is_file() {
            return Err(Error::NothingToSave);
        }
        let name = validate::normalize_name(target_name)?;
        let target = self.store.stored_path(&name);
        self.backups.backup(&target)?;
        self.storage.copy_file(&self.paths.live_settings, &target)?;
        self.store.set_active(&name)?;
        info!(profile = %name, "saved settings profile");
        Ok(name)
    }

    /// Status-annotated profile listing.
    pub fn list_entries(&self) -> Result<Vec<ProfileEntry>, Error> {
        self.init_dirs()?;
        let entries = self
            .store
            .list_entries(&self.paths.live_settings, |p| self.backups.fingerprint(p))?;
        Ok(entries)
    }

    /// Sorted names of all stored profiles.
    pub fn list_stored(&self) -> Result<Vec<String>, Error> {
        self.init_dirs()?;
        Ok(self.store.list_stored()?)
    }

    /// Delete backups not observed within `older_than`. Returns the count
    /// deleted.
    pub fn prune_backups(&self, older_than: Duration) -> Result<usize, Error> {
        self.init_dirs()?;
        let deleted = self.backups.prune(older_than)?;
        info!(deleted, "pruned backups");
        Ok(deleted)
    }

    /// Validate a candidate profile name without touching the filesystem.
    pub fn validate_name(&self, name: &str) -> Result<(), NameError> {
        validate::validate_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ProfileStatus;
    use crate::test_utils::setup_test_paths;
    use std::fs;
    use tempfile::TempDir;

    fn manager(temp_dir: &TempDir) -> Manager {
        Manager::new(setup_test_paths(temp_dir))
    }

    #[test]
    fn test_use_profile_end_to_end() {
        let temp_dir = TempDir::new().unwrap();
        let mgr = manager(&temp_dir);
        fs::create_dir_all(&mgr.paths().store_dir).unwrap();
        fs::write(mgr.store().stored_path("work"), "stored content").unwrap();
        fs::write(&mgr.paths().live_settings, "previous live").unwrap();

        let name = mgr.use_profile("  work ").unwrap();

        assert_eq!(name, "work");
        assert_eq!(
            fs::read_to_string(&mgr.paths().live_settings).unwrap(),
            "stored content"
        );
        assert_eq!(mgr.store().active_name(), "work");
        // The previous live content was backed up before the overwrite.
        let backups: Vec<_> = fs::read_dir(&mgr.paths().backup_dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(backups.len(), 1);
        assert_eq!(fs::read_to_string(&backups[0]).unwrap(), "previous live");
    }

    #[test]
    fn test_use_profile_unknown_name() {
        let temp_dir = TempDir::new().unwrap();
        let mgr = manager(&temp_dir);
        let err = mgr.use_profile("ghost").unwrap_err();
        assert!(matches!(err, Error::ProfileNotFound(name) if name == "ghost"));
    }

    #[test]
    fn test_use_profile_invalid_name() {
        let temp_dir = TempDir::new().unwrap();
        let mgr = manager(&temp_dir);
        let err = mgr.use_profile("a/b").unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidName(crate::validate::NameError::InvalidChars)
        ));
    }

    #[test]
    fn test_use_profile_missing_live_file_is_fine() {
        let temp_dir = TempDir::new().unwrap();
        let mgr = manager(&temp_dir);
        fs::create_dir_all(&mgr.paths().store_dir).unwrap();
        fs::write(mgr.store().stored_path("work"), "content").unwrap();

        // First-ever activation: nothing to back up.
        mgr.use_profile("work").unwrap();
        assert_eq!(fs::read_dir(&mgr.paths().backup_dir).unwrap().count(), 0);
    }

    #[test]
    fn test_save_requires_live_file() {
        let temp_dir = TempDir::new().unwrap();
        let mgr = manager(&temp_dir);
        assert!(matches!(mgr.save("work").unwrap_err(), Error::NothingToSave));
    }

    #[test]
    fn test_save_creates_profile_and_backs_up_overwritten_one() {
        let temp_dir = TempDir::new().unwrap();
        let mgr = manager(&temp_dir);
        fs::create_dir_all(&mgr.paths().store_dir).unwrap();
        fs::write(mgr.store().stored_path("work"), "old profile").unwrap();
        fs::write(&mgr.paths().live_settings, "new live").unwrap();

        mgr.save("work").unwrap();

        assert_eq!(
            fs::read_to_string(mgr.store().stored_path("work")).unwrap(),
            "new live"
        );
        assert_eq!(mgr.store().active_name(), "work");
        let backups: Vec<_> = fs::read_dir(&mgr.paths().backup_dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(backups.len(), 1);
        assert_eq!(fs::read_to_string(&backups[0]).unwrap(), "old profile");
    }

    #[test]
    fn test_save_new_name_without_existing_profile() {
        let temp_dir = TempDir::new().unwrap();
        let mgr = manager(&temp_dir);
        fs::create_dir_all(&mgr.paths().base_dir).unwrap();
        fs::write(&mgr.paths().live_settings, "fresh").unwrap();

        mgr.save("fresh-profile").unwrap();
        assert!(mgr.store().exists("fresh-profile"));
        assert_eq!(fs::read_dir(&mgr.paths().backup_dir).unwrap().count(), 0);
    }

    #[test]
    fn test_list_entries_composes() {
        let temp_dir = TempDir::new().unwrap();
        let mgr = manager(&temp_dir);
        fs::create_dir_all(&mgr.paths().base_dir).unwrap();
        fs::write(&mgr.paths().live_settings, "live").unwrap();
        mgr.save("work").unwrap();

        let entries = mgr.list_entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "work");
        assert_eq!(entries[0].status, ProfileStatus::Active { modified: false });
    }
}
