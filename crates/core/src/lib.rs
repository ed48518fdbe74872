pub mod config;
pub mod errors;
pub mod logging;
pub mod models;
pub mod registry;
pub mod traits;

pub use config::{AppConfig, DatabaseConfig, FailurePolicy, LogConfig, WorkerConfig};
pub use errors::{SentinelError, SentinelResult};
pub use models::{Task, TaskResult, TaskStatus};
pub use registry::{RunnerBinding, RunnerRegistry};
pub use traits::{
    JsonPayloadCodec, PayloadCodec, RunnerContext, TaskPayload, TaskRepository, TaskRunner,
};
