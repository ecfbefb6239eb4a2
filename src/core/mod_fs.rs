use crate::core::mod_manager::LocalModStore;
use crate::models::error::SError;
use crate::models::mod_dto::{FailedMod, LocalMod, ModError, ModManifest, UnsafeLocalMod};
use crate::models::paths::ModPaths;
use crate::utils::toml::Toml;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Per-mod state persisted next to the manifest.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct ModState {
    pub enabled: bool,
}

/// Mods installed as folders under one root, each with a `manifest.json`.
#[derive(Clone, Debug)]
pub struct ModFS {
    pub mods_root: Utf8PathBuf,
}

impl ModFS {
    pub fn new(mods_root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            mods_root: mods_root.into(),
        }
    }

    pub fn read_manifest(path: &Utf8Path) -> Result<ModManifest, SError> {
        let manifest: ModManifest = serde_json::from_reader(std::fs::File::open(path)?)?;
        if manifest.unique_name.trim().is_empty() {
            return Err(SError::ParseError("uniqueName is empty".into()));
        }
        Ok(manifest)
    }

    pub fn read_state(mod_path: &Utf8Path) -> Result<ModState, SError> {
        let paths = ModPaths::new(mod_path);
        if !paths.state.exists() {
            return Ok(ModState::default());
        }
        Toml::read(&paths.state)
    }

    fn manifest_dirs(&self) -> Vec<Utf8PathBuf> {
        let manifest_name = ModPaths::default().manifest;
        let mut dirs: Vec<Utf8PathBuf> = WalkDir::new(&self.mods_root)
            .min_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| Utf8PathBuf::from_path_buf(e.into_path()).ok())
            .filter(|p| p.file_name() == Some(manifest_name.as_str()))
            .filter_map(|p| p.parent().map(Utf8Path::to_path_buf))
            .collect();
        dirs.sort();
        dirs
    }

    fn load_mod(&self, mod_path: Utf8PathBuf) -> UnsafeLocalMod {
        let manifest_path = ModPaths::new(&mod_path).manifest;
        let loaded = Self::read_manifest(&manifest_path)
            .and_then(|manifest| Self::read_state(&mod_path).map(|state| (manifest, state)));

        match loaded {
            Ok((manifest, state)) => {
                UnsafeLocalMod::Valid(LocalMod::new(mod_path, manifest, state.enabled))
            }
            Err(e) => {
                warn!("Failed to load mod at {}: {}", mod_path, e);
                let display_path = mod_path
                    .strip_prefix(&self.mods_root)
                    .map(Utf8Path::to_string)
                    .unwrap_or_else(|_| mod_path.to_string());
                UnsafeLocalMod::Invalid(FailedMod {
                    mod_path,
                    display_path,
                    error: ModError::invalid_manifest(e.to_string()),
                })
            }
        }
    }
}

impl LocalModStore for ModFS {
    fn scan_local_mods(&self) -> Result<Vec<UnsafeLocalMod>, SError> {
        if !self.mods_root.exists() {
            std::fs::create_dir_all(&self.mods_root)?;
        }
        let mods: Vec<UnsafeLocalMod> = self
            .manifest_dirs()
            .into_iter()
            .map(|dir| self.load_mod(dir))
            .collect();
        debug!(count = mods.len(), "Scanned {}", self.mods_root);
        Ok(mods)
    }

    fn write_enabled(&self, mod_path: &Utf8Path, enabled: bool) -> Result<(), SError> {
        let mut state = Self::read_state(mod_path).unwrap_or_else(|e| {
            warn!("Replacing unreadable state of {}: {}", mod_path, e);
            ModState::default()
        });
        state.enabled = enabled;
        Toml::write(&ModPaths::new(mod_path).state, &state)
    }

    fn remove_mod_files(&self, mod_path: &Utf8Path) -> Result<(), SError> {
        if mod_path == self.mods_root.as_path() || !mod_path.starts_with(&self.mods_root) {
            return Err(SError::IOError(format!(
                "{} is not inside {}",
                mod_path, self.mods_root
            )));
        }
        if mod_path.exists() {
            std::fs::remove_dir_all(mod_path)?;
        }
        Ok(())
    }
}
