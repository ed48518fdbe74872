pub mod app_config;
pub mod database;
pub mod worker;

pub use app_config::{AppConfig, LogConfig};
pub use database::DatabaseConfig;
pub use worker::{FailurePolicy, WorkerConfig};
