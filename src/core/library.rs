use crate::core::cache::ValidationCache;
use crate::core::dto_builder::build_unified;
use crate::core::mod_manager::{LocalModStore, ModInstaller, RemoteCatalog};
use crate::core::registry::{ModRegistry, RegistrySnapshot};
use crate::core::resolver::DependencyGraph;
use crate::core::transition::{CancelToken, TransitionEngine};
use crate::core::validator::{self, ValidationReport};
use crate::models::error::SError;
use crate::models::mod_dto::UnifiedMod;
use crate::models::transition::{Lifecycle, Warning};
use camino::Utf8Path;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// The mod library: registry, validation and transitions wired to their
/// collaborators. All operations are synchronous; see `commands` for the
/// async entry points.
pub struct Library {
    registry: ModRegistry,
    validation: ValidationCache,
    store: Arc<dyn LocalModStore>,
    catalog: Arc<dyn RemoteCatalog>,
    installer: Arc<dyn ModInstaller>,
}

impl Library {
    pub fn new(
        store: Arc<dyn LocalModStore>,
        catalog: Arc<dyn RemoteCatalog>,
        installer: Arc<dyn ModInstaller>,
    ) -> Self {
        Self {
            registry: ModRegistry::new(),
            validation: ValidationCache::default(),
            store,
            catalog,
            installer,
        }
    }

    /// Creates the library and performs the initial local and remote loads.
    /// A catalog failure is logged and leaves the catalog empty.
    pub fn open(
        store: Arc<dyn LocalModStore>,
        catalog: Arc<dyn RemoteCatalog>,
        installer: Arc<dyn ModInstaller>,
    ) -> Result<Self, SError> {
        let library = Self::new(store, catalog, installer);
        library.refresh_local()?;
        if let Err(e) = library.refresh_remote() {
            tracing::error!("Failed to load the remote catalog: {e}");
        }
        Ok(library)
    }

    fn engine(&self) -> TransitionEngine<'_> {
        TransitionEngine::new(&self.registry, self.store.as_ref(), self.installer.as_ref())
    }

    pub fn registry(&self) -> &ModRegistry {
        &self.registry
    }

    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.registry.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.registry.subscribe()
    }

    pub fn refresh_local(&self) -> Result<(), SError> {
        self.engine().refresh_local()
    }

    pub fn refresh_remote(&self) -> Result<(), SError> {
        let catalog = self.catalog.fetch_remote_catalog()?;
        let snapshot = self.registry.replace_remote(catalog);
        info!(mods = snapshot.remote.len(), "Remote catalog refreshed");
        Ok(())
    }

    pub fn get_unified_view(&self, key: &str) -> Option<UnifiedMod> {
        let snapshot = self.snapshot();
        let local = snapshot.get(key);
        let unique_name = local.and_then(|l| l.unique_name()).unwrap_or(key);
        build_unified(local, snapshot.remote(unique_name))
    }

    pub fn validate(&self) -> Arc<ValidationReport> {
        self.validation.get_or_compute(&self.snapshot())
    }

    pub fn has_disabled_deps(&self, key: &str) -> bool {
        let snapshot = self.snapshot();
        let unique_name = snapshot
            .get(key)
            .and_then(|l| l.unique_name())
            .unwrap_or(key);
        DependencyGraph::new(&snapshot).has_disabled_deps(unique_name)
    }

    pub fn can_fix(&self, key: &str) -> bool {
        self.snapshot().get(key).is_some_and(validator::can_fix)
    }

    pub fn lifecycle(&self, unique_name: &str) -> Lifecycle {
        self.registry.lifecycle(unique_name)
    }

    pub fn toggle(
        &self,
        unique_name: &str,
        enable: bool,
        recursive: bool,
    ) -> Result<Vec<Warning>, SError> {
        self.toggle_with(unique_name, enable, recursive, &CancelToken::new())
    }

    pub fn toggle_with(
        &self,
        unique_name: &str,
        enable: bool,
        recursive: bool,
        cancel: &CancelToken,
    ) -> Result<Vec<Warning>, SError> {
        self.engine().toggle(unique_name, enable, recursive, cancel)
    }

    pub fn fix(&self, unique_name: &str) -> Result<Vec<Warning>, SError> {
        self.fix_with(unique_name, &CancelToken::new())
    }

    pub fn fix_with(&self, unique_name: &str, cancel: &CancelToken) -> Result<Vec<Warning>, SError> {
        self.engine().fix(unique_name, cancel)
    }

    pub fn uninstall(&self, unique_name: &str) -> Result<Vec<Warning>, SError> {
        self.engine().uninstall(unique_name)
    }

    pub fn uninstall_broken(&self, mod_path: &Utf8Path) -> Result<(), SError> {
        self.engine().uninstall_broken(mod_path)
    }

    /// Installs `unique_name` from the catalog, replacing any installed copy.
    pub fn install(&self, unique_name: &str) -> Result<(), SError> {
        self.engine().install(unique_name)
    }

    pub fn update(&self, unique_name: &str) -> Result<(), SError> {
        self.engine().update(unique_name)
    }
}
