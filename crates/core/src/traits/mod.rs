pub mod repository;
pub mod runner;

pub use repository::TaskRepository;
pub use runner::{JsonPayloadCodec, PayloadCodec, RunnerContext, TaskPayload, TaskRunner};
