use camino::{Utf8Path, Utf8PathBuf};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "mod_steward";

/// User-facing settings persisted with confy.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ManagerSettings {
    pub mods_root: Utf8PathBuf,
    pub log_dir: Utf8PathBuf,
    pub debug: bool,
    pub console_log: bool,
    /// Enable disabled dependencies without asking.
    pub auto_enable_deps: bool,
    /// Disable dependencies nothing else needs when their dependent is disabled.
    pub auto_disable_deps: bool,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        let base_dir = ProjectDirs::from("com", "martes", APP_NAME)
            .map(|dirs| dirs.data_dir().to_path_buf())
            .or_else(|| {
                std::env::current_exe()
                    .ok()
                    .and_then(|exe_path| exe_path.parent().map(|p| p.to_path_buf()))
            })
            .and_then(|p| Utf8PathBuf::from_path_buf(p).ok())
            .unwrap_or_else(|| Utf8PathBuf::from("."));

        Self {
            mods_root: base_dir.join("mods"),
            log_dir: base_dir.join("logs"),
            debug: false,
            console_log: false,
            auto_enable_deps: false,
            auto_disable_deps: false,
        }
    }
}

impl ManagerSettings {
    pub fn load() -> Result<Self, confy::ConfyError> {
        confy::load(APP_NAME, "settings")
    }

    pub fn save(&self) -> Result<(), confy::ConfyError> {
        confy::store(APP_NAME, "settings", self)
    }

    pub fn load_path(path: &Utf8Path) -> Result<Self, confy::ConfyError> {
        confy::load_path(path)
    }

    pub fn store_path(&self, path: &Utf8Path) -> Result<(), confy::ConfyError> {
        confy::store_path(path, self)
    }
}
