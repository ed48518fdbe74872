//! 基础设施层：任务存储接口的具体实现
//!
//! - `database`: PostgreSQL / SQLite 后端（sqlx），按URL自动识别
//! - `memory`: 内存实现，嵌入式部署和测试用

pub mod database;
pub mod memory;

pub use database::{DatabasePool, DatabaseType};
pub use memory::InMemoryTaskRepository;
