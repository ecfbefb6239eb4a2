use crate::commands::AppState;
use crate::config::ManagerSettings;
use crate::core::validator::ValidationReport;
use crate::models::error::SError;
use crate::models::mod_dto::UnifiedMod;
use crate::models::transition::Warning;
use crate::utils::thread::run_blocking;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Result of a toggle request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "status", content = "warnings")]
pub enum ToggleOutcome {
    Applied(Vec<Warning>),
    /// Enabling would leave dependencies disabled and the user has not said
    /// whether to enable them. Nothing was changed.
    NeedsConfirmation,
}

/// Decides whether a toggle propagates to dependencies.
///
/// `confirmed` is the user's answer to "also enable the dependencies?".
/// Returns `None` when that question still has to be asked.
pub fn resolve_recursive(
    settings: &ManagerSettings,
    enable: bool,
    has_disabled_deps: bool,
    confirmed: Option<bool>,
) -> Option<bool> {
    let enable_deps = if enable && has_disabled_deps {
        if settings.auto_enable_deps {
            true
        } else {
            confirmed?
        }
    } else {
        false
    };
    Some(enable_deps || (settings.auto_disable_deps && !enable))
}

#[instrument(skip(state))]
pub async fn refresh_local_db(state: &AppState) -> Result<(), SError> {
    let library = state.library.clone();
    run_blocking(move || library.refresh_local()).await
}

#[instrument(skip(state))]
pub async fn refresh_remote_db(state: &AppState) -> Result<(), SError> {
    let library = state.library.clone();
    run_blocking(move || library.refresh_remote()).await
}

#[instrument(skip(state))]
pub async fn get_unified_mod(state: &AppState, unique_name: String) -> Option<UnifiedMod> {
    state.library.get_unified_view(&unique_name)
}

#[instrument(skip(state))]
pub async fn validate_mods(state: &AppState) -> Result<Arc<ValidationReport>, SError> {
    let library = state.library.clone();
    run_blocking(move || Ok(library.validate())).await
}

#[instrument(skip(state))]
pub async fn has_disabled_deps(state: &AppState, unique_name: String) -> bool {
    state.library.has_disabled_deps(&unique_name)
}

#[instrument(skip(state))]
pub async fn toggle_mod(
    state: &AppState,
    unique_name: String,
    enable: bool,
    confirmed: Option<bool>,
) -> Result<ToggleOutcome, SError> {
    let settings = state.settings.lock().clone();
    let has_disabled = enable && state.library.has_disabled_deps(&unique_name);

    let Some(recursive) = resolve_recursive(&settings, enable, has_disabled, confirmed) else {
        debug!("Asking before enabling the dependencies of {}", unique_name);
        return Ok(ToggleOutcome::NeedsConfirmation);
    };

    info!(recursive, "Toggling {}", unique_name);
    let library = state.library.clone();
    run_blocking(move || library.toggle(&unique_name, enable, recursive))
        .await
        .map(ToggleOutcome::Applied)
}

#[instrument(skip(state))]
pub async fn fix_deps(state: &AppState, unique_name: String) -> Result<Vec<Warning>, SError> {
    let library = state.library.clone();
    run_blocking(move || library.fix(&unique_name)).await
}

#[instrument(skip(state))]
pub async fn uninstall_mod(state: &AppState, unique_name: String) -> Result<Vec<Warning>, SError> {
    let library = state.library.clone();
    run_blocking(move || library.uninstall(&unique_name)).await
}

#[instrument(skip(state))]
pub async fn uninstall_broken_mod(state: &AppState, mod_path: Utf8PathBuf) -> Result<(), SError> {
    let library = state.library.clone();
    run_blocking(move || library.uninstall_broken(&mod_path)).await
}

/// Also serves as "reinstall" for a mod that is already present.
#[instrument(skip(state))]
pub async fn install_mod(state: &AppState, unique_name: String) -> Result<(), SError> {
    let library = state.library.clone();
    run_blocking(move || library.install(&unique_name)).await
}

#[instrument(skip(state))]
pub async fn update_mod(state: &AppState, unique_name: String) -> Result<(), SError> {
    let library = state.library.clone();
    run_blocking(move || library.update(&unique_name)).await
}
