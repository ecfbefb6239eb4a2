pub mod mods;

use crate::config::ManagerSettings;
use crate::core::library::Library;
use crate::core::mod_fs::ModFS;
use crate::core::mod_manager::{ModInstaller, RemoteCatalog};
use crate::models::error::SError;
use parking_lot::Mutex;
use std::sync::Arc;

/// State shared by every command. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub library: Arc<Library>,
    pub settings: Arc<Mutex<ManagerSettings>>,
}

impl AppState {
    pub fn new(library: Library, settings: ManagerSettings) -> Self {
        Self {
            library: Arc::new(library),
            settings: Arc::new(Mutex::new(settings)),
        }
    }

    /// Opens the mods directory named in `settings` and loads both databases.
    pub fn open(
        settings: ManagerSettings,
        catalog: Arc<dyn RemoteCatalog>,
        installer: Arc<dyn ModInstaller>,
    ) -> Result<Self, SError> {
        let store = Arc::new(ModFS::new(settings.mods_root.clone()));
        let library = Library::open(store, catalog, installer)?;
        Ok(Self::new(library, settings))
    }
}
