use camino::Utf8PathBuf;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Contents of a mod's `manifest.json`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ModManifest {
    pub unique_name: String,
    pub name: String,
    pub author: String,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub conflicts: Vec<String>,
    /// Relative path of a prepatcher executable. Mods carrying one are
    /// load-order sensitive.
    #[serde(default)]
    pub patcher: Option<String>,
    #[serde(default)]
    pub donate_links: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum ErrorType {
    InvalidManifest,
    DuplicateMod,
    MissingDep,
    DisabledDep,
    ConflictingMod,
    Outdated,
}

impl ErrorType {
    /// Errors that make a mod unusable until the user intervenes.
    pub fn is_fatal(self) -> bool {
        matches!(self, ErrorType::InvalidManifest | ErrorType::DuplicateMod)
    }

    /// Errors a fix chain knows how to repair.
    pub fn is_fixable(self) -> bool {
        matches!(
            self,
            ErrorType::MissingDep | ErrorType::DisabledDep | ErrorType::Outdated
        )
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ModError {
    pub error_type: ErrorType,
    pub payload: Option<String>,
}

impl ModError {
    pub fn new(error_type: ErrorType, payload: impl Into<String>) -> Self {
        Self {
            error_type,
            payload: Some(payload.into()),
        }
    }

    pub fn invalid_manifest(reason: impl Into<String>) -> Self {
        Self::new(ErrorType::InvalidManifest, reason)
    }

    pub fn is(&self, error_type: ErrorType) -> bool {
        self.error_type == error_type
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocalMod {
    pub unique_name: String,
    pub mod_path: Utf8PathBuf,
    pub manifest: ModManifest,
    pub enabled: bool,
    /// Filled in by the registry on every publish, in discovery order.
    #[serde(default)]
    pub errors: Vec<ModError>,
}

impl LocalMod {
    pub fn new(mod_path: impl Into<Utf8PathBuf>, manifest: ModManifest, enabled: bool) -> Self {
        Self {
            unique_name: manifest.unique_name.clone(),
            mod_path: mod_path.into(),
            manifest,
            enabled,
            errors: Vec::new(),
        }
    }

    pub fn has_error(&self, error_type: ErrorType) -> bool {
        self.errors.iter().any(|e| e.is(error_type))
    }

    pub fn has_fatal_error(&self) -> bool {
        self.errors.iter().any(|e| e.error_type.is_fatal())
    }

    pub fn is_prepatcher(&self) -> bool {
        self.manifest.patcher.is_some()
    }
}

/// A mod folder whose manifest could not be read at all.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FailedMod {
    pub mod_path: Utf8PathBuf,
    pub display_path: String,
    pub error: ModError,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "loadState", content = "mod", rename_all = "camelCase")]
pub enum UnsafeLocalMod {
    Valid(LocalMod),
    Invalid(FailedMod),
}

impl UnsafeLocalMod {
    pub fn mod_path(&self) -> &Utf8PathBuf {
        match self {
            UnsafeLocalMod::Valid(m) => &m.mod_path,
            UnsafeLocalMod::Invalid(m) => &m.mod_path,
        }
    }

    pub fn unique_name(&self) -> Option<&str> {
        match self {
            UnsafeLocalMod::Valid(m) => Some(&m.unique_name),
            UnsafeLocalMod::Invalid(_) => None,
        }
    }

    pub fn enabled(&self) -> bool {
        matches!(self, UnsafeLocalMod::Valid(m) if m.enabled)
    }

    pub fn as_valid(&self) -> Option<&LocalMod> {
        match self {
            UnsafeLocalMod::Valid(m) => Some(m),
            UnsafeLocalMod::Invalid(_) => None,
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, UnsafeLocalMod::Invalid(_))
    }

    /// All errors on the record; an invalid record has exactly one.
    pub fn errors(&self) -> Vec<ModError> {
        match self {
            UnsafeLocalMod::Valid(m) => m.errors.clone(),
            UnsafeLocalMod::Invalid(m) => vec![m.error.clone()],
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ModThumbnail {
    pub main: Option<String>,
    pub open_graph: Option<String>,
}

/// Catalog entry. Read-only between catalog refreshes.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteMod {
    pub unique_name: String,
    pub name: String,
    pub slug: String,
    pub author: String,
    pub description: String,
    pub version: String,
    pub download_count: i64,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub thumbnail: ModThumbnail,
}

impl RemoteMod {
    pub const REQUIRES_DLC: &'static str = "requires-dlc";

    pub fn requires_dlc(&self) -> bool {
        self.tags.contains(Self::REQUIRES_DLC)
    }
}

/// Merged view of a local and/or remote record. Never stored.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedMod {
    pub unique_name: String,
    pub name: String,
    pub slug: Option<String>,
    pub author: String,
    pub description: Option<String>,
    pub version: String,
    pub outdated: bool,
    pub enabled: bool,
    pub requires_dlc: bool,
    pub thumbnail_url: Option<String>,
    pub downloads: i64,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorLevel {
    Err,
    Warn,
}
