pub mod api;
pub mod classifier;
pub mod config;
pub mod enforcer;
pub mod engine;
pub mod error;
pub mod init;
pub mod ledger;
pub mod logger;
pub mod pipeline;
pub mod store;
