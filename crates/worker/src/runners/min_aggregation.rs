use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use sentinel_core::{
    RunnerContext, SentinelError, SentinelResult, TaskPayload, TaskResult, TaskRunner,
};

pub const TASK_TYPE: &str = "min_aggregation";

/// 载荷：指标名加数值序列
#[derive(Debug, Deserialize)]
pub struct MinAggregationPayload {
    pub metric: String,
    pub values: Vec<f64>,
}

impl TaskPayload for MinAggregationPayload {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// 对一段指标序列求最小值
pub struct MinAggregationRunner;

#[async_trait]
impl TaskRunner for MinAggregationRunner {
    fn name(&self) -> &str {
        TASK_TYPE
    }

    async fn execute(
        &self,
        payload: &dyn TaskPayload,
        ctx: &RunnerContext,
    ) -> SentinelResult<Vec<TaskResult>> {
        let payload = payload
            .as_any()
            .downcast_ref::<MinAggregationPayload>()
            .ok_or_else(|| SentinelError::Internal("载荷类型与执行器不匹配".to_string()))?;

        if payload.values.is_empty() {
            return Err(SentinelError::TaskExecution(format!(
                "指标 '{}' 的序列为空，无法聚合",
                payload.metric
            )));
        }

        let min = payload.values.iter().copied().fold(f64::INFINITY, f64::min);

        Ok(vec![TaskResult::new(
            ctx.task_id,
            json!({ "metric": payload.metric, "aggregation": "min", "value": min }),
        )])
    }
}
