pub mod file;
pub mod logging;
pub mod thread;
pub mod toml;
