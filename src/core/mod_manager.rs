use crate::models::error::SError;
use crate::models::mod_dto::{RemoteMod, UnsafeLocalMod};
use camino::Utf8Path;
use std::collections::BTreeMap;

/// Where installed mods live and where their enabled flags are persisted.
pub trait LocalModStore: Send + Sync {
    /// Every mod folder found, readable or not.
    fn scan_local_mods(&self) -> Result<Vec<UnsafeLocalMod>, SError>;

    /// Persists the enabled flag of the mod at `mod_path`. Must be atomic per mod.
    fn write_enabled(&self, mod_path: &Utf8Path, enabled: bool) -> Result<(), SError>;

    fn remove_mod_files(&self, mod_path: &Utf8Path) -> Result<(), SError>;
}

/// The published mod catalog.
pub trait RemoteCatalog: Send + Sync {
    fn fetch_remote_catalog(&self) -> Result<BTreeMap<String, RemoteMod>, SError>;
}

/// Downloads and places mod files.
pub trait ModInstaller: Send + Sync {
    fn install_mod(&self, unique_name: &str) -> Result<(), SError>;

    fn update_mod(&self, unique_name: &str) -> Result<(), SError>;
}

/// Catalog used when running without network access.
pub struct OfflineCatalog;

impl RemoteCatalog for OfflineCatalog {
    fn fetch_remote_catalog(&self) -> Result<BTreeMap<String, RemoteMod>, SError> {
        Ok(BTreeMap::new())
    }
}

/// Installer used when no download backend is configured.
pub struct OfflineInstaller;

impl ModInstaller for OfflineInstaller {
    fn install_mod(&self, unique_name: &str) -> Result<(), SError> {
        Err(SError::InstallError {
            unique_name: unique_name.to_string(),
            message: "no installer is configured".into(),
        })
    }

    fn update_mod(&self, unique_name: &str) -> Result<(), SError> {
        Err(SError::InstallError {
            unique_name: unique_name.to_string(),
            message: "no installer is configured".into(),
        })
    }
}
