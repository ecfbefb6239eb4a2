use crate::models::transition::Warning;
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Operation errors. Data problems on individual mods are not errors, they
/// live on the records as [`crate::models::mod_dto::ModError`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Display)]
pub enum SError {
    #[display("Mod not found: {_0}")]
    ModNotFound(String),
    #[display("A transition is already running for {_0}")]
    TransitionInProgress(String),
    #[display("{unique_name} cannot be enabled: {reason}")]
    CannotEnable { unique_name: String, reason: String },
    #[display("{unique_name} cannot be fixed: {reason}")]
    Unfixable { unique_name: String, reason: String },
    /// `completed` holds the warnings of the steps that ran before the
    /// failing one. Those steps are not rolled back.
    #[display("{unique_name}: step '{action}' failed: {cause}")]
    ActionFailed {
        unique_name: String,
        action: String,
        cause: Box<SError>,
        completed: Vec<Warning>,
    },
    #[display("Install of {unique_name} failed: {message}")]
    InstallError { unique_name: String, message: String },
    #[display("IO error: {_0}")]
    IOError(String),
    #[display("Parse error: {_0}")]
    ParseError(String),
    #[display("Config error: {_0}")]
    ConfigError(String),
    #[display("Async runtime error: {_0}")]
    AsyncRuntimeError(String),
}

impl std::error::Error for SError {}

impl SError {
    /// Wraps `self` as the cause of a failed chain step.
    pub fn at_step(
        self,
        unique_name: &str,
        action: impl ToString,
        completed: Vec<Warning>,
    ) -> SError {
        SError::ActionFailed {
            unique_name: unique_name.to_string(),
            action: action.to_string(),
            cause: Box::new(self),
            completed,
        }
    }
}

impl From<std::io::Error> for SError {
    fn from(e: std::io::Error) -> Self {
        SError::IOError(e.to_string())
    }
}

impl From<serde_json::Error> for SError {
    fn from(e: serde_json::Error) -> Self {
        SError::ParseError(e.to_string())
    }
}

impl From<toml::de::Error> for SError {
    fn from(e: toml::de::Error) -> Self {
        SError::ParseError(e.to_string())
    }
}

impl From<toml::ser::Error> for SError {
    fn from(e: toml::ser::Error) -> Self {
        SError::ParseError(e.to_string())
    }
}

impl From<confy::ConfyError> for SError {
    fn from(e: confy::ConfyError) -> Self {
        SError::ConfigError(e.to_string())
    }
}

impl From<walkdir::Error> for SError {
    fn from(e: walkdir::Error) -> Self {
        SError::IOError(e.to_string())
    }
}
