use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use sentinel_core::{
    RunnerContext, SentinelError, SentinelResult, TaskPayload, TaskResult, TaskRunner,
};

pub const TASK_TYPE: &str = "min_max_threshold";

/// 载荷：一段分桶的指标时间序列加上下阈值
///
/// - `min`: 下阈值，数据点严格小于它时告警
/// - `max`: 上阈值，数据点严格大于它时告警
/// - `series`: （桶起点epoch毫秒，数值）序列
#[derive(Debug, Deserialize)]
pub struct MinMaxThresholdPayload {
    pub metric: String,
    pub series: Vec<(i64, f64)>,
    pub window_start: i64,
    pub window_end: i64,
    pub bucket_millis: i64,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl TaskPayload for MinMaxThresholdPayload {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// 阈值越界异常检测
///
/// 对窗口内每个时间桶检查是否越过上下阈值，每个越界桶产出一条
/// 结果：score是相对阈值的偏离幅度，weight是整个窗口的均值。
pub struct MinMaxThresholdRunner;

#[async_trait]
impl TaskRunner for MinMaxThresholdRunner {
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
            .downcast_ref::<MinMaxThresholdPayload>()
            .ok_or_else(|| SentinelError::Internal("载荷类型与执行器不匹配".to_string()))?;

        if payload.bucket_millis <= 0 {
            return Err(SentinelError::TaskExecution(
                "bucket_millis必须大于0".to_string(),
            ));
        }
        if payload.window_end <= payload.window_start {
            return Err(SentinelError::TaskExecution(
                "检测窗口为空".to_string(),
            ));
        }

        // 窗口均值作为结果权重
        let total: f64 = payload.series.iter().map(|(_, v)| v).sum();
        let num_buckets =
            ((payload.window_end - payload.window_start) / payload.bucket_millis).max(1);
        let average = total / num_buckets as f64;

        let mut results = Vec::new();
        for &(bucket_start, value) in &payload.series {
            let deviation = deviation_from_threshold(value, payload.min, payload.max);
            if deviation != 0.0 {
                let message = format_message(payload.min, payload.max, value, deviation);
                results.push(TaskResult::with_message(
                    ctx.task_id,
                    json!({
                        "metric": payload.metric,
                        "window_start": bucket_start,
                        "window_end": bucket_start + payload.bucket_millis,
                        "value": value,
                        "score": deviation.abs(),
                        "weight": average,
                    }),
                    message,
                ));
            }
        }

        Ok(results)
    }
}

/// 数据点相对阈值的偏离；未越界返回0
fn deviation_from_threshold(value: f64, min: Option<f64>, max: Option<f64>) -> f64 {
    if let Some(min) = min {
        if value < min {
            return calculate_change(value, min);
        }
    }
    if let Some(max) = max {
        if value > max {
            return calculate_change(value, max);
        }
    }
    0.0
}

/// 相对基线的变化率；基线为0时退化为绝对差
fn calculate_change(current: f64, baseline: f64) -> f64 {
    if baseline == 0.0 {
        current
    } else {
        (current - baseline) / baseline
    }
}

fn format_message(min: Option<f64>, max: Option<f64>, value: f64, change: f64) -> String {
    let fmt_opt = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_else(|| "null".to_string());
    format!(
        "min={}, max={}, value {}, change {}",
        fmt_opt(min),
        fmt_opt(max),
        value,
        change
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RunnerContext {
        RunnerContext {
            task_id: 7,
            task_type: TASK_TYPE.to_string(),
            worker_id: "worker-test".to_string(),
        }
    }

    fn payload(series: Vec<(i64, f64)>, min: Option<f64>, max: Option<f64>) -> MinMaxThresholdPayload {
        let buckets = series.len().max(1) as i64;
        MinMaxThresholdPayload {
            metric: "error_rate".to_string(),
            series,
            window_start: 0,
            window_end: buckets * 60_000,
            bucket_millis: 60_000,
            min,
            max,
        }
    }

    #[tokio::test]
    async fn values_within_range_produce_no_anomaly() {
        let p = payload(vec![(0, 5.0), (60_000, 6.0)], Some(1.0), Some(10.0));
        let results = MinMaxThresholdRunner.execute(&p, &ctx()).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn value_above_max_is_flagged_with_positive_change() {
        let p = payload(vec![(0, 5.0), (60_000, 20.0)], None, Some(10.0));
        let results = MinMaxThresholdRunner.execute(&p, &ctx()).await.unwrap();
        assert_eq!(results.len(), 1);

        let output = &results[0].output;
        assert_eq!(output["window_start"], 60_000);
        assert_eq!(output["window_end"], 120_000);
        assert_eq!(output["value"], 20.0);
        // (20 - 10) / 10 = 1.0
        assert_eq!(output["score"], 1.0);
        // 窗口均值 (5 + 20) / 2
        assert_eq!(output["weight"], 12.5);
        assert_eq!(
            results[0].message.as_deref(),
            Some("min=null, max=10, value 20, change 1")
        );
    }

    #[tokio::test]
    async fn value_below_min_is_flagged_with_negative_change() {
        let p = payload(vec![(0, 2.0)], Some(4.0), None);
        let results = MinMaxThresholdRunner.execute(&p, &ctx()).await.unwrap();
        assert_eq!(results.len(), 1);
        // (2 - 4) / 4 = -0.5，score取绝对值
        assert_eq!(results[0].output["score"], 0.5);
    }

    #[tokio::test]
    async fn each_violating_bucket_yields_one_result() {
        let p = payload(
            vec![(0, 20.0), (60_000, 5.0), (120_000, 30.0)],
            None,
            Some(10.0),
        );
        let results = MinMaxThresholdRunner.execute(&p, &ctx()).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn empty_window_is_rejected() {
        let mut p = payload(vec![(0, 1.0)], None, Some(10.0));
        p.window_end = p.window_start;
        let err = MinMaxThresholdRunner.execute(&p, &ctx()).await.unwrap_err();
        assert!(matches!(err, SentinelError::TaskExecution(_)));
    }
}
