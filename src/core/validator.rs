use crate::core::registry::RegistrySnapshot;
use crate::core::version;
use crate::models::mod_dto::{ErrorLevel, ErrorType, LocalMod, ModError, UnsafeLocalMod};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationEntry {
    pub errors: Vec<ModError>,
    pub level: Option<ErrorLevel>,
}

/// Errors and severity for every local record, keyed like the registry.
pub type ValidationReport = BTreeMap<String, ValidationEntry>;

/// Computes the errors of one valid mod against the rest of the snapshot.
/// Order: duplicate, dependencies (declaration order), conflicts, outdated.
pub fn check_mod(m: &LocalMod, snapshot: &RegistrySnapshot) -> Vec<ModError> {
    let mut errors = Vec::new();

    if let Some(other) = snapshot
        .copies(&m.unique_name)
        .find(|copy| copy.mod_path != m.mod_path)
    {
        errors.push(ModError::new(ErrorType::DuplicateMod, other.mod_path.as_str()));
    }

    for dep in declared(&m.manifest.dependencies, &m.unique_name) {
        if !snapshot.is_installed(dep) {
            errors.push(ModError::new(ErrorType::MissingDep, dep));
        } else if !snapshot.is_enabled(dep) {
            errors.push(ModError::new(ErrorType::DisabledDep, dep));
        }
    }

    if m.enabled {
        for conflict in declared(&m.manifest.conflicts, &m.unique_name) {
            if snapshot.is_enabled(conflict) {
                errors.push(ModError::new(ErrorType::ConflictingMod, conflict));
            }
        }
    }

    if let Some(remote) = snapshot.remote(&m.unique_name) {
        if version::is_outdated(&m.manifest.version, &remote.version) {
            errors.push(ModError::new(ErrorType::Outdated, remote.version.as_str()));
        }
    }

    errors
}

/// Declared names in order, without repeats or self references.
pub(crate) fn declared<'a>(names: &'a [String], own: &'a str) -> impl Iterator<Item = &'a str> {
    names
        .iter()
        .enumerate()
        .filter(move |(i, name)| name.as_str() != own && !names[..*i].contains(*name))
        .map(|(_, name)| name.as_str())
}

pub fn error_level(record: &UnsafeLocalMod) -> Option<ErrorLevel> {
    let m = match record {
        UnsafeLocalMod::Invalid(_) => return Some(ErrorLevel::Err),
        UnsafeLocalMod::Valid(m) => m,
    };

    if m.has_fatal_error() {
        Some(ErrorLevel::Err)
    } else if !m.errors.is_empty() && m.enabled {
        Some(ErrorLevel::Warn)
    } else {
        None
    }
}

/// Whether the fix chain may run: the mod is enabled and every error is one
/// an update, install or enable can repair.
pub fn can_fix(record: &UnsafeLocalMod) -> bool {
    record.as_valid().is_some_and(can_fix_mod)
}

pub fn can_fix_mod(m: &LocalMod) -> bool {
    m.enabled && !m.errors.is_empty() && m.errors.iter().all(|e| e.error_type.is_fixable())
}

pub fn validate(snapshot: &RegistrySnapshot) -> ValidationReport {
    snapshot
        .local
        .iter()
        .map(|(key, record)| {
            (
                key.clone(),
                ValidationEntry {
                    errors: record.errors(),
                    level: error_level(record),
                },
            )
        })
        .collect()
}
