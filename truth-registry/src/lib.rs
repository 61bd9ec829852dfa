//! truth-registry: register and verify content identifiers over HTTP

pub mod api;
pub mod config;
pub mod db;
pub mod logger;
pub mod service;

pub use config::Config;
pub use service::TruthRegistry;
