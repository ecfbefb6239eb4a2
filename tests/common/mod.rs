#![allow(dead_code)]

use camino::{Utf8Path, Utf8PathBuf};
use mod_steward_lib::core::library::Library;
use mod_steward_lib::core::mod_manager::{LocalModStore, ModInstaller, RemoteCatalog};
use mod_steward_lib::core::transition::CancelToken;
use mod_steward_lib::models::error::SError;
use mod_steward_lib::models::mod_dto::{LocalMod, ModManifest, RemoteMod, UnsafeLocalMod};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub fn mod_path(unique_name: &str) -> Utf8PathBuf {
    Utf8PathBuf::from("/mods").join(unique_name)
}

pub fn manifest(unique_name: &str, version: &str, deps: &[&str]) -> ModManifest {
    ModManifest {
        unique_name: unique_name.to_string(),
        name: format!("{} Mod", unique_name),
        author: "tester".to_string(),
        version: version.to_string(),
        dependencies: deps.iter().map(|d| d.to_string()).collect(),
        ..Default::default()
    }
}

pub fn local(unique_name: &str, enabled: bool, deps: &[&str]) -> UnsafeLocalMod {
    UnsafeLocalMod::Valid(LocalMod::new(
        mod_path(unique_name),
        manifest(unique_name, "1.0.0", deps),
        enabled,
    ))
}

pub fn local_at(path: &str, m: ModManifest, enabled: bool) -> UnsafeLocalMod {
    UnsafeLocalMod::Valid(LocalMod::new(path, m, enabled))
}

pub fn remote(unique_name: &str, version: &str) -> RemoteMod {
    RemoteMod {
        unique_name: unique_name.to_string(),
        name: format!("{} Mod", unique_name),
        slug: unique_name.to_lowercase(),
        author: "tester".to_string(),
        description: format!("Remote {}", unique_name),
        version: version.to_string(),
        download_count: 42,
        ..Default::default()
    }
}

/// In-memory `LocalModStore`. Writes can be made to fail on demand.
#[derive(Default)]
pub struct FakeStore {
    pub records: Mutex<Vec<UnsafeLocalMod>>,
    pub fail_writes: AtomicBool,
    pub fail_paths: Mutex<Vec<Utf8PathBuf>>,
    pub writes: Mutex<Vec<(Utf8PathBuf, bool)>>,
}

impl FakeStore {
    pub fn with(records: Vec<UnsafeLocalMod>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Default::default()
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn add(&self, record: UnsafeLocalMod) {
        self.records.lock().push(record);
    }

    pub fn enabled_at(&self, path: &Utf8Path) -> Option<bool> {
        self.records
            .lock()
            .iter()
            .find(|r| r.mod_path().as_path() == path)
            .map(UnsafeLocalMod::enabled)
    }
}

impl LocalModStore for FakeStore {
    fn scan_local_mods(&self) -> Result<Vec<UnsafeLocalMod>, SError> {
        Ok(self.records.lock().clone())
    }

    fn write_enabled(&self, mod_path: &Utf8Path, enabled: bool) -> Result<(), SError> {
        if self.fail_writes.load(Ordering::SeqCst)
            || self.fail_paths.lock().iter().any(|p| p.as_path() == mod_path)
        {
            return Err(SError::IOError(format!("write to {} refused", mod_path)));
        }
        let mut records = self.records.lock();
        let found = records.iter_mut().find_map(|r| match r {
            UnsafeLocalMod::Valid(m) if m.mod_path.as_path() == mod_path => Some(m),
            _ => None,
        });
        match found {
            Some(m) => {
                m.enabled = enabled;
                self.writes.lock().push((mod_path.to_path_buf(), enabled));
                Ok(())
            }
            None => Err(SError::IOError(format!("{} does not exist", mod_path))),
        }
    }

    fn remove_mod_files(&self, mod_path: &Utf8Path) -> Result<(), SError> {
        self.records
            .lock()
            .retain(|r| r.mod_path().as_path() != mod_path);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeCatalog {
    pub mods: Mutex<BTreeMap<String, RemoteMod>>,
}

impl FakeCatalog {
    pub fn with(mods: Vec<RemoteMod>) -> Self {
        Self {
            mods: Mutex::new(
                mods.into_iter()
                    .map(|m| (m.unique_name.clone(), m))
                    .collect(),
            ),
        }
    }
}

impl RemoteCatalog for FakeCatalog {
    fn fetch_remote_catalog(&self) -> Result<BTreeMap<String, RemoteMod>, SError> {
        Ok(self.mods.lock().clone())
    }
}

/// Installs and updates by editing the backing `FakeStore`, using the
/// versions published in the catalog.
pub struct FakeInstaller {
    pub store: Arc<FakeStore>,
    pub catalog: Arc<FakeCatalog>,
    pub calls: Mutex<Vec<String>>,
    pub fail: AtomicBool,
    /// Cancelled while an install is running.
    pub cancel_on_install: Mutex<Option<CancelToken>>,
}

impl FakeInstaller {
    fn published_version(&self, unique_name: &str) -> Result<String, SError> {
        self.catalog
            .mods
            .lock()
            .get(unique_name)
            .map(|m| m.version.clone())
            .ok_or_else(|| SError::InstallError {
                unique_name: unique_name.to_string(),
                message: "not in catalog".into(),
            })
    }

    fn check_fail(&self, unique_name: &str) -> Result<(), SError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SError::InstallError {
                unique_name: unique_name.to_string(),
                message: "download failed".into(),
            });
        }
        Ok(())
    }
}

impl ModInstaller for FakeInstaller {
    fn install_mod(&self, unique_name: &str) -> Result<(), SError> {
        self.calls.lock().push(format!("install {}", unique_name));
        self.check_fail(unique_name)?;
        let version = self.published_version(unique_name)?;
        if let Some(cancel) = self.cancel_on_install.lock().as_ref() {
            cancel.cancel();
        }

        // Reinstalling replaces the files but keeps the enabled flag
        let path = mod_path(unique_name);
        let mut records = self.store.records.lock();
        let enabled = records
            .iter()
            .find(|r| r.mod_path() == &path)
            .is_some_and(UnsafeLocalMod::enabled);
        records.retain(|r| r.mod_path() != &path);
        records.push(UnsafeLocalMod::Valid(LocalMod::new(
            path,
            manifest(unique_name, &version, &[]),
            enabled,
        )));
        Ok(())
    }

    fn update_mod(&self, unique_name: &str) -> Result<(), SError> {
        self.calls.lock().push(format!("update {}", unique_name));
        self.check_fail(unique_name)?;
        let version = self.published_version(unique_name)?;
        for record in self.store.records.lock().iter_mut() {
            if let UnsafeLocalMod::Valid(m) = record {
                if m.unique_name == unique_name {
                    m.manifest.version = version.clone();
                }
            }
        }
        Ok(())
    }
}

pub struct Harness {
    pub library: Library,
    pub store: Arc<FakeStore>,
    pub catalog: Arc<FakeCatalog>,
    pub installer: Arc<FakeInstaller>,
}

/// Opens a library over in-memory collaborators and loads both databases.
pub fn harness(records: Vec<UnsafeLocalMod>, remote: Vec<RemoteMod>) -> Harness {
    let store = Arc::new(FakeStore::with(records));
    let catalog = Arc::new(FakeCatalog::with(remote));
    let installer = Arc::new(FakeInstaller {
        store: store.clone(),
        catalog: catalog.clone(),
        calls: Mutex::new(Vec::new()),
        fail: AtomicBool::new(false),
        cancel_on_install: Mutex::new(None),
    });
    let library = Library::open(store.clone(), catalog.clone(), installer.clone()).unwrap();
    Harness {
        library,
        store,
        catalog,
        installer,
    }
}

impl Harness {
    pub fn enabled(&self, unique_name: &str) -> bool {
        self.library.snapshot().is_enabled(unique_name)
    }

    pub fn errors(&self, key: &str) -> Vec<mod_steward_lib::models::mod_dto::ModError> {
        self.library
            .snapshot()
            .get(key)
            .map(UnsafeLocalMod::errors)
            .unwrap_or_default()
    }
}
