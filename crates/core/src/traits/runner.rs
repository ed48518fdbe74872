//! 任务执行器接口定义
//!
//! 每个任务类型对应一对可插拔组件：载荷解码器和执行器。
//! 注册表（见 [`crate::registry`]）按 `task_type` 标签完成多态分发。
//!
//! 执行器内部是任意业务逻辑，可以自己做 I/O，但不允许改写任务
//! 自身的状态记录 —— 状态迁移只属于调度核心，因此执行器拿到的
//! 上下文里没有仓储句柄。

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::models::TaskResult;
use crate::{SentinelError, SentinelResult};

/// 解码后的任务载荷（类型擦除形式）
///
/// 执行器通过 `as_any().downcast_ref::<T>()` 取回自己约定的具体类型。
pub trait TaskPayload: Any + Send + Sync + fmt::Debug {
    fn as_any(&self) -> &dyn Any;
}

/// 载荷解码器：把存储中的原始JSON变成执行器认识的载荷
pub trait PayloadCodec: Send + Sync {
    fn decode(&self, raw: &serde_json::Value) -> SentinelResult<Box<dyn TaskPayload>>;
}

/// 基于serde的通用JSON解码器
///
/// 绝大多数任务类型的载荷就是一个可反序列化的结构体，
/// 用它配合 [`RunnerRegistry::register_json`](crate::RunnerRegistry::register_json)
/// 即可，无需手写解码器。
pub struct JsonPayloadCodec<P> {
    _marker: PhantomData<P>,
}

impl<P> JsonPayloadCodec<P> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<P> Default for JsonPayloadCodec<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> PayloadCodec for JsonPayloadCodec<P>
where
    P: TaskPayload + DeserializeOwned,
{
    fn decode(&self, raw: &serde_json::Value) -> SentinelResult<Box<dyn TaskPayload>> {
        let payload: P = serde_json::from_value(raw.clone())
            .map_err(|e| SentinelError::PayloadDecode(e.to_string()))?;
        Ok(Box::new(payload))
    }
}

/// 单次执行的只读上下文
#[derive(Debug, Clone)]
pub struct RunnerContext {
    pub task_id: i64,
    pub task_type: String,
    pub worker_id: String,
}

/// 任务执行器核心接口
///
/// # 线程安全
///
/// 要求 `Send + Sync`：同一执行器实例会被池内所有worker循环共享。
///
/// # 实现示例
///
/// ```ignore
/// struct EchoRunner;
///
/// #[async_trait]
/// impl TaskRunner for EchoRunner {
///     fn name(&self) -> &str {
///         "echo"
///     }
///
///     async fn execute(
///         &self,
///         payload: &dyn TaskPayload,
///         ctx: &RunnerContext,
///     ) -> SentinelResult<Vec<TaskResult>> {
///         let payload = payload
///             .as_any()
///             .downcast_ref::<EchoPayload>()
///             .ok_or_else(|| SentinelError::Internal("载荷类型不匹配".to_string()))?;
///         Ok(vec![TaskResult::new(ctx.task_id, serde_json::json!(payload.text))])
///     }
/// }
/// ```
#[async_trait]
pub trait TaskRunner: Send + Sync {
    /// 执行器名称，日志用
    fn name(&self) -> &str;

    /// 执行一次任务，返回零条或多条结果
    async fn execute(
        &self,
        payload: &dyn TaskPayload,
        ctx: &RunnerContext,
    ) -> SentinelResult<Vec<TaskResult>>;
}
