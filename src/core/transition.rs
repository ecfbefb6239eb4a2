use crate::core::mod_manager::{LocalModStore, ModInstaller};
use crate::core::registry::{ModRegistry, RegistrySnapshot, TransitionGuard};
use crate::core::resolver::DependencyGraph;
use crate::core::validator;
use crate::models::error::SError;
use crate::models::mod_dto::{LocalMod, UnsafeLocalMod};
use crate::models::transition::{FixAction, Phase, PrepatcherEvent, Warning};
use camino::{Utf8Path, Utf8PathBuf};
use std::iter::once;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Cooperative cancellation for chains. Checked between steps, never inside one.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Executes enable/disable/fix/uninstall against the registry.
///
/// Every state change is persisted through the store before a new snapshot
/// is published, so a failed write leaves the registry untouched.
pub struct TransitionEngine<'a> {
    registry: &'a ModRegistry,
    store: &'a dyn LocalModStore,
    installer: &'a dyn ModInstaller,
}

impl<'a> TransitionEngine<'a> {
    pub fn new(
        registry: &'a ModRegistry,
        store: &'a dyn LocalModStore,
        installer: &'a dyn ModInstaller,
    ) -> Self {
        Self {
            registry,
            store,
            installer,
        }
    }

    /// Rescans the store and publishes the result. Mods that are enabled but
    /// carry a fatal error are switched off on the way in.
    pub fn refresh_local(&self) -> Result<(), SError> {
        let mut records = self.store.scan_local_mods()?;

        let provisional =
            RegistrySnapshot::build(records.clone(), self.registry.snapshot().remote.clone());
        let blocked: Vec<Utf8PathBuf> = provisional
            .valid_mods()
            .filter(|m| m.enabled && m.has_fatal_error())
            .map(|m| m.mod_path.clone())
            .collect();

        for path in &blocked {
            warn!("Disabling {} because it cannot be loaded", path);
            if let Err(e) = self.store.write_enabled(path, false) {
                warn!("Failed to persist disabled state for {}: {}", path, e);
            }
        }
        for record in records.iter_mut() {
            if let UnsafeLocalMod::Valid(m) = record {
                if blocked.contains(&m.mod_path) {
                    m.enabled = false;
                }
            }
        }

        let snapshot = self.registry.replace_local(records);
        info!(mods = snapshot.local.len(), "Local mods refreshed");
        Ok(())
    }

    pub fn toggle(
        &self,
        key: &str,
        enable: bool,
        recursive: bool,
        cancel: &CancelToken,
    ) -> Result<Vec<Warning>, SError> {
        let snapshot = self.registry.snapshot();
        let unique_name = match snapshot.get(key) {
            Some(UnsafeLocalMod::Valid(m)) => m.unique_name.clone(),
            Some(UnsafeLocalMod::Invalid(_)) if enable => {
                return Err(SError::CannotEnable {
                    unique_name: key.to_string(),
                    reason: "manifest could not be read".into(),
                })
            }
            Some(UnsafeLocalMod::Invalid(_)) => return Ok(Vec::new()),
            None if snapshot.is_installed(key) => key.to_string(),
            None => return Err(SError::ModNotFound(key.to_string())),
        };

        if enable {
            self.enable(&unique_name, recursive, cancel)
        } else {
            self.disable(&unique_name, recursive, cancel)
        }
    }

    fn enable(
        &self,
        root: &str,
        recursive: bool,
        cancel: &CancelToken,
    ) -> Result<Vec<Warning>, SError> {
        let _guard = self.registry.begin(root, Phase::Enabling)?;
        let snapshot = self.registry.snapshot();
        ensure_enableable(&snapshot, root)?;

        let mut warnings = Vec::new();
        let mut attempted_members = false;
        if recursive {
            let members: Vec<String> = DependencyGraph::new(&snapshot)
                .closure_to_enable(root)
                .into_iter()
                .collect();
            debug!(?members, "Enabling dependencies of {}", root);

            for (i, dep) in members.iter().enumerate() {
                if cancel.is_cancelled() {
                    warnings.push(Warning::Cancelled {
                        unique_name: root.to_string(),
                        skipped: members[i..]
                            .iter()
                            .cloned()
                            .chain(once(root.to_string()))
                            .collect(),
                    });
                    return Ok(warnings);
                }

                attempted_members = true;
                match self.enable_dependency(dep) {
                    Ok(w) => warnings.extend(w),
                    Err(e) => {
                        warn!("Could not enable dependency {} of {}: {}", dep, root, e);
                        warnings.push(Warning::DependencyFailed {
                            unique_name: dep.clone(),
                            reason: e.to_string(),
                        });
                    }
                }
            }

            if cancel.is_cancelled() {
                warnings.push(Warning::Cancelled {
                    unique_name: root.to_string(),
                    skipped: vec![root.to_string()],
                });
                return Ok(warnings);
            }
        }

        match self.write_enabled(root, true) {
            Ok(w) => warnings.extend(w),
            // Dependencies enabled above stay enabled; report them with the failure.
            Err(e) if attempted_members => return Err(e.at_step(root, "Enable", warnings)),
            Err(e) => return Err(e),
        }
        Ok(warnings)
    }

    fn enable_dependency(&self, unique_name: &str) -> Result<Option<Warning>, SError> {
        let _guard = self.registry.begin(unique_name, Phase::Enabling)?;
        ensure_enableable(&self.registry.snapshot(), unique_name)?;
        self.write_enabled(unique_name, true)
    }

    fn disable(
        &self,
        root: &str,
        recursive: bool,
        cancel: &CancelToken,
    ) -> Result<Vec<Warning>, SError> {
        let _guard = self.registry.begin(root, Phase::Disabling)?;
        let closure: Vec<String> = if recursive {
            DependencyGraph::new(&self.registry.snapshot())
                .closure_to_disable(root)
                .into_iter()
                .collect()
        } else {
            Vec::new()
        };

        let mut warnings: Vec<Warning> = self.write_enabled(root, false)?.into_iter().collect();

        for (i, dep) in closure.iter().enumerate() {
            if cancel.is_cancelled() {
                warnings.push(Warning::Cancelled {
                    unique_name: root.to_string(),
                    skipped: closure[i..].to_vec(),
                });
                break;
            }

            let result = self
                .registry
                .begin(dep, Phase::Disabling)
                .and_then(|_dep_guard| self.write_enabled(dep, false));
            match result {
                Ok(w) => warnings.extend(w),
                Err(e) => {
                    warn!("Could not disable dependency {} of {}: {}", dep, root, e);
                    warnings.push(Warning::DependencyFailed {
                        unique_name: dep.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(warnings)
    }

    /// Persists and publishes the enabled flag. Enabling touches the primary
    /// copy only; disabling switches off every copy of the unique name.
    fn write_enabled(&self, unique_name: &str, enabled: bool) -> Result<Option<Warning>, SError> {
        let snapshot = self.registry.snapshot();
        let targets: Vec<&LocalMod> = if enabled {
            snapshot.find(unique_name).into_iter().collect()
        } else {
            snapshot.copies(unique_name).collect()
        };
        if targets.is_empty() {
            return Err(SError::ModNotFound(unique_name.to_string()));
        }

        let changing: Vec<&LocalMod> = targets.into_iter().filter(|m| m.enabled != enabled).collect();
        if changing.is_empty() {
            return Ok(None);
        }

        let mut written: Vec<Utf8PathBuf> = Vec::new();
        let mut failure = None;
        for m in &changing {
            match self.store.write_enabled(&m.mod_path, enabled) {
                Ok(()) => written.push(m.mod_path.clone()),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        if !written.is_empty() {
            self.registry.update_local(|records| {
                for record in records.iter_mut() {
                    if let UnsafeLocalMod::Valid(m) = record {
                        if written.contains(&m.mod_path) {
                            m.enabled = enabled;
                        }
                    }
                }
            });
        }
        if let Some(e) = failure {
            return Err(e);
        }

        info!("{} {}", if enabled { "Enabled" } else { "Disabled" }, unique_name);
        let event = if enabled {
            PrepatcherEvent::Enabled
        } else {
            PrepatcherEvent::Disabled
        };
        Ok(changing
            .iter()
            .any(|m| m.is_prepatcher())
            .then(|| Warning::Prepatcher {
                unique_name: unique_name.to_string(),
                event,
            }))
    }

    /// Repairs an enabled mod's dependency chain step by step. The local
    /// registry is refreshed afterwards whether or not every step succeeded.
    pub fn fix(&self, unique_name: &str, cancel: &CancelToken) -> Result<Vec<Warning>, SError> {
        let guard = self.registry.begin(unique_name, Phase::Fixing)?;
        let snapshot = self.registry.snapshot();

        let fixable = match snapshot.find(unique_name) {
            Some(m) => validator::can_fix_mod(m),
            None if snapshot.get(unique_name).is_some() => false,
            None => return Err(SError::ModNotFound(unique_name.to_string())),
        };
        if !fixable {
            return Err(SError::Unfixable {
                unique_name: unique_name.to_string(),
                reason: "only enabled mods whose errors are missing, disabled or outdated dependencies can be fixed".into(),
            });
        }

        let chain = DependencyGraph::new(&snapshot).fix_chain(unique_name)?;
        info!(?chain, "Fixing {}", unique_name);

        let result = self.run_chain(&guard, &chain, cancel);
        if let Err(e) = self.refresh_local() {
            warn!("Refresh after fixing {} failed: {}", unique_name, e);
        }
        result
    }

    fn run_chain(
        &self,
        guard: &TransitionGuard<'_>,
        chain: &[FixAction],
        cancel: &CancelToken,
    ) -> Result<Vec<Warning>, SError> {
        let unique_name = guard.unique_name();
        let mut warnings = Vec::new();

        for (i, action) in chain.iter().enumerate() {
            let skipped = || -> Vec<String> { chain[i..].iter().map(ToString::to_string).collect() };
            if cancel.is_cancelled() {
                warnings.push(Warning::Cancelled {
                    unique_name: unique_name.to_string(),
                    skipped: skipped(),
                });
                break;
            }

            debug!(%action, "Fix step for {}", unique_name);
            let step = match action {
                FixAction::Update => {
                    guard.set_phase(Phase::Updating);
                    let updated = self
                        .installer
                        .update_mod(unique_name)
                        .and_then(|_| self.refresh_local())
                        .map(|_| Vec::new());
                    guard.set_phase(Phase::Fixing);
                    updated
                }
                FixAction::InstallDep(dep) => self
                    .install_dependency(dep)
                    .and_then(|_| self.enable(dep, true, cancel)),
                FixAction::EnableDep(dep) => self.enable(dep, true, cancel),
            };

            let step_warnings = match step {
                Ok(w) => w,
                Err(e) => return Err(e.at_step(unique_name, action, warnings)),
            };

            // A cancel seen inside the nested enable left this step unfinished.
            let (nested_cancel, rest): (Vec<Warning>, Vec<Warning>) = step_warnings
                .into_iter()
                .partition(|w| matches!(w, Warning::Cancelled { .. }));
            warnings.extend(rest);
            if !nested_cancel.is_empty() {
                warnings.push(Warning::Cancelled {
                    unique_name: unique_name.to_string(),
                    skipped: skipped(),
                });
                break;
            }
        }

        Ok(warnings)
    }

    fn install_dependency(&self, unique_name: &str) -> Result<(), SError> {
        let _guard = self.registry.begin(unique_name, Phase::Installing)?;
        self.installer.install_mod(unique_name)?;
        self.refresh_local()
    }

    /// Removes a mod. Valid mods drop out of the registry and the republish
    /// re-validates their dependents; invalid records go by path.
    pub fn uninstall(&self, key: &str) -> Result<Vec<Warning>, SError> {
        let snapshot = self.registry.snapshot();
        let m = match snapshot.get(key) {
            Some(UnsafeLocalMod::Valid(m)) => m.clone(),
            Some(UnsafeLocalMod::Invalid(failed)) => {
                self.uninstall_broken(&failed.mod_path)?;
                return Ok(Vec::new());
            }
            None => snapshot
                .find(key)
                .cloned()
                .ok_or_else(|| SError::ModNotFound(key.to_string()))?,
        };

        let _guard = self.registry.begin(&m.unique_name, Phase::Uninstalling)?;
        self.store.remove_mod_files(&m.mod_path)?;
        self.registry
            .update_local(|records| records.retain(|r| r.mod_path() != &m.mod_path));
        info!("Uninstalled {} from {}", m.unique_name, m.mod_path);

        Ok(if m.is_prepatcher() {
            vec![Warning::Prepatcher {
                unique_name: m.unique_name.clone(),
                event: PrepatcherEvent::Uninstalled,
            }]
        } else {
            Vec::new()
        })
    }

    /// Path-based removal. Nothing is known about the dependencies of a mod
    /// whose manifest could not be read.
    pub fn uninstall_broken(&self, mod_path: &Utf8Path) -> Result<(), SError> {
        let _guard = self.registry.begin(mod_path.as_str(), Phase::Uninstalling)?;
        self.store.remove_mod_files(mod_path)?;
        self.registry
            .update_local(|records| records.retain(|r| r.mod_path().as_path() != mod_path));
        info!("Removed broken mod at {}", mod_path);
        Ok(())
    }

    /// Installs a mod from the catalog, or reinstalls it over an existing copy.
    pub fn install(&self, unique_name: &str) -> Result<(), SError> {
        let _guard = self.registry.begin(unique_name, Phase::Installing)?;
        self.installer.install_mod(unique_name)?;
        info!("Installed {}", unique_name);
        self.refresh_local()
    }

    pub fn update(&self, unique_name: &str) -> Result<(), SError> {
        let _guard = self.registry.begin(unique_name, Phase::Updating)?;
        if self.registry.snapshot().find(unique_name).is_none() {
            return Err(SError::ModNotFound(unique_name.to_string()));
        }
        self.installer.update_mod(unique_name)?;
        self.refresh_local()
    }
}

fn ensure_enableable(snapshot: &RegistrySnapshot, unique_name: &str) -> Result<(), SError> {
    let m = snapshot
        .find(unique_name)
        .ok_or_else(|| SError::ModNotFound(unique_name.to_string()))?;
    match m.errors.iter().find(|e| e.error_type.is_fatal()) {
        Some(e) => Err(SError::CannotEnable {
            unique_name: unique_name.to_string(),
            reason: format!("{} error present", e.error_type),
        }),
        None => Ok(()),
    }
}
