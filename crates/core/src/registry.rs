//! 执行器注册表
//!
//! 注册表在进程启动阶段可变构建，启动后以 `Arc` 只读共享给所有
//! worker循环，查找路径上没有锁。

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::traits::{JsonPayloadCodec, PayloadCodec, TaskPayload, TaskRunner};
use crate::{SentinelError, SentinelResult};

/// 一个任务类型绑定的（解码器，执行器）组合
#[derive(Clone)]
pub struct RunnerBinding {
    pub codec: Arc<dyn PayloadCodec>,
    pub runner: Arc<dyn TaskRunner>,
}

impl std::fmt::Debug for RunnerBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunnerBinding")
            .field("runner", &self.runner.name())
            .finish_non_exhaustive()
    }
}

/// 执行器注册表：`task_type` → （解码器，执行器）
#[derive(Default)]
pub struct RunnerRegistry {
    bindings: HashMap<String, RunnerBinding>,
}

impl RunnerRegistry {
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    /// 注册一个任务类型。重复注册视为装配错误。
    pub fn register(
        &mut self,
        task_type: impl Into<String>,
        codec: Arc<dyn PayloadCodec>,
        runner: Arc<dyn TaskRunner>,
    ) -> SentinelResult<()> {
        let task_type = task_type.into();
        if self.bindings.contains_key(&task_type) {
            return Err(SentinelError::DuplicateRunner { task_type });
        }
        self.bindings.insert(task_type, RunnerBinding { codec, runner });
        Ok(())
    }

    /// 注册一个使用标准JSON解码的任务类型
    pub fn register_json<P>(
        &mut self,
        task_type: impl Into<String>,
        runner: Arc<dyn TaskRunner>,
    ) -> SentinelResult<()>
    where
        P: TaskPayload + DeserializeOwned,
    {
        self.register(task_type, Arc::new(JsonPayloadCodec::<P>::new()), runner)
    }

    /// 按任务类型解析出绑定
    ///
    /// 未注册的类型返回 `UnknownTaskType`，这对该条任务是致命的，
    /// 对worker不是。
    pub fn resolve(&self, task_type: &str) -> SentinelResult<&RunnerBinding> {
        self.bindings
            .get(task_type)
            .ok_or_else(|| SentinelError::UnknownTaskType {
                task_type: task_type.to_string(),
            })
    }

    pub fn registered_types(&self) -> Vec<String> {
        self.bindings.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskResult;
    use crate::traits::RunnerContext;
    use async_trait::async_trait;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct NoopPayload {
        #[allow(dead_code)]
        value: i64,
    }

    impl TaskPayload for NoopPayload {
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    struct NoopRunner;

    #[async_trait]
    impl TaskRunner for NoopRunner {
        fn name(&self) -> &str {
            "noop"
        }

        async fn execute(
            &self,
            _payload: &dyn TaskPayload,
            _ctx: &RunnerContext,
        ) -> SentinelResult<Vec<TaskResult>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn register_and_resolve_roundtrip() {
        let mut registry = RunnerRegistry::new();
        registry
            .register_json::<NoopPayload>("noop", Arc::new(NoopRunner))
            .unwrap();

        let binding = registry.resolve("noop").unwrap();
        assert_eq!(binding.runner.name(), "noop");
        assert_eq!(registry.registered_types(), vec!["noop".to_string()]);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = RunnerRegistry::new();
        registry
            .register_json::<NoopPayload>("noop", Arc::new(NoopRunner))
            .unwrap();
        let err = registry
            .register_json::<NoopPayload>("noop", Arc::new(NoopRunner))
            .unwrap_err();
        assert!(matches!(err, SentinelError::DuplicateRunner { .. }));
    }

    #[test]
    fn unknown_task_type_is_reported() {
        let registry = RunnerRegistry::new();
        let err = registry.resolve("missing").unwrap_err();
        assert!(matches!(
            err,
            SentinelError::UnknownTaskType { task_type } if task_type == "missing"
        ));
    }
}
