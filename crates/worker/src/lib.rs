//! Worker执行层
//!
//! 任务抢占协议、worker循环和池驱动器，以及平台内置的任务执行器。

pub mod acquisition;
pub mod context;
pub mod driver;
pub mod runners;
pub mod worker_loop;

pub use acquisition::TaskAcquirer;
pub use context::WorkerContext;
pub use driver::TaskDriver;
