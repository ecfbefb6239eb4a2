use derive_more::Display;
use serde::{Deserialize, Serialize};

/// What a mod is in the middle of, while a transition holds it.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum Phase {
    Enabling,
    Disabling,
    Updating,
    Installing,
    Uninstalling,
    Fixing,
}

/// The state a concurrent reader observes for a unique name.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    Enabled,
    Disabled,
    Transitioning(Phase),
    Removed,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum PrepatcherEvent {
    Enabled,
    Disabled,
    Uninstalled,
}

/// Informational results delivered next to a successful operation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Warning {
    /// A prepatcher mod changed state; load order or game files may need attention.
    Prepatcher {
        unique_name: String,
        event: PrepatcherEvent,
    },
    /// One member of a recursive enable could not be enabled.
    DependencyFailed { unique_name: String, reason: String },
    /// The operation was cancelled; `skipped` lists the steps never started.
    Cancelled {
        unique_name: String,
        skipped: Vec<String>,
    },
}

/// One step of a dependency fix chain.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Display)]
pub enum FixAction {
    #[display("Update")]
    Update,
    #[display("InstallDep({_0})")]
    InstallDep(String),
    #[display("EnableDep({_0})")]
    EnableDep(String),
}
