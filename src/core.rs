pub mod cache;
pub mod dto_builder;
pub mod library;
pub mod mod_fs;
pub mod mod_manager;
pub mod registry;
pub mod resolver;
pub mod transition;
pub mod validator;
pub mod version;
