use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{DatabaseConfig, WorkerConfig};

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: String,
    pub format: String, // "json" | "pretty"
}

impl LogConfig {
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.level.as_str()) {
            return Err(anyhow::anyhow!(
                "无效的日志级别: {}，支持: {:?}",
                self.level,
                valid_levels
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.format.as_str()) {
            return Err(anyhow::anyhow!(
                "无效的日志格式: {}，支持: {:?}",
                self.format,
                valid_formats
            ));
        }

        Ok(())
    }
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub worker: WorkerConfig,
    pub log: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "postgresql://localhost/sentinel".to_string(),
                max_connections: 10,
                min_connections: 1,
                connection_timeout_seconds: 30,
            },
            worker: WorkerConfig {
                worker_id: String::new(),
                max_parallel_tasks: 3,
                poll_interval_ms: 500,
                max_poll_interval_ms: 10_000,
                scan_limit: 50,
                on_failure: Default::default(),
            },
            log: LogConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// 加载配置
    ///
    /// 加载顺序（后者覆盖前者）：
    /// 1. 内置默认值
    /// 2. 配置文件（TOML格式）
    /// 3. 环境变量（前缀：SENTINEL，层级分隔符：`__`）
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder()
            .set_default("database.url", "postgresql://localhost/sentinel")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 1)?
            .set_default("database.connection_timeout_seconds", 30)?
            .set_default("worker.worker_id", "")?
            .set_default("worker.max_parallel_tasks", 3)?
            .set_default("worker.poll_interval_ms", 500)?
            .set_default("worker.max_poll_interval_ms", 10_000)?
            .set_default("worker.scan_limit", 50)?
            .set_default("worker.on_failure", "mark_failed")?
            .set_default("log.level", "info")?
            .set_default("log.format", "pretty")?;

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            } else {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
        } else {
            let default_paths = [
                "config/sentinel.toml",
                "sentinel.toml",
                "/etc/sentinel/config.toml",
            ];
            for path in &default_paths {
                if Path::new(path).exists() {
                    builder = builder.add_source(File::new(path, FileFormat::Toml));
                    break;
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("SENTINEL")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;

        config.validate()?;

        Ok(config)
    }

    /// 校验全部配置段
    pub fn validate(&self) -> Result<()> {
        self.database.validate().context("数据库配置无效")?;
        self.worker.validate().context("Worker配置无效")?;
        self.log.validate().context("日志配置无效")?;
        Ok(())
    }
}
