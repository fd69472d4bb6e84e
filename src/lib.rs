pub mod commands;
pub mod config;
pub mod error;
pub mod layout;
pub mod logging;
pub mod migrator;
pub mod model;
pub mod output;
pub mod store;
