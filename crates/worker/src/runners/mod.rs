//! 内置任务执行器
//!
//! 平台自带的两个计算插件，同时作为第三方执行器接入方式的样板：
//! - `min_aggregation`: 指标序列求最小值
//! - `min_max_threshold`: 阈值越界异常检测

pub mod min_aggregation;
pub mod min_max_threshold;

pub use min_aggregation::{MinAggregationPayload, MinAggregationRunner};
pub use min_max_threshold::{MinMaxThresholdPayload, MinMaxThresholdRunner};

use std::sync::Arc;

use sentinel_core::{RunnerRegistry, SentinelResult};

/// 注册全部内置执行器
pub fn register_builtin_runners(registry: &mut RunnerRegistry) -> SentinelResult<()> {
    registry.register_json::<MinAggregationPayload>(
        min_aggregation::TASK_TYPE,
        Arc::new(MinAggregationRunner),
    )?;
    registry.register_json::<MinMaxThresholdPayload>(
        min_max_threshold::TASK_TYPE,
        Arc::new(MinMaxThresholdRunner),
    )?;
    Ok(())
}
