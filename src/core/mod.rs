pub mod codec;
pub mod command;
pub mod config;
pub mod error;
pub mod history;
pub mod prompt;
pub mod script;
pub mod store;
pub mod types;
