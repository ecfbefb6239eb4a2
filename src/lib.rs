pub mod commands;
pub mod config;
pub mod core;
pub mod models;
pub mod utils;

use crate::commands::AppState;
use crate::config::ManagerSettings;
use crate::core::mod_manager::{ModInstaller, RemoteCatalog};
use crate::models::error::SError;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;

/// Loads settings, installs logging and opens the mods directory.
///
/// Keep the returned guard alive for as long as logs should be written.
pub fn bootstrap(
    catalog: Arc<dyn RemoteCatalog>,
    installer: Arc<dyn ModInstaller>,
) -> Result<(AppState, WorkerGuard), SError> {
    let settings = ManagerSettings::load()?;
    let guard = utils::logging::setup_logging(
        &settings.log_dir,
        "mod_steward",
        settings.debug,
        settings.console_log,
    )?;
    let state = AppState::open(settings, catalog, installer)?;
    Ok((state, guard))
}
