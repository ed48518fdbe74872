use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Arg, Command};
use tokio::signal;
use tracing::{error, info};

use sentinel_core::{logging, AppConfig, RunnerRegistry};
use sentinel_infrastructure::DatabasePool;
use sentinel_worker::runners::register_builtin_runners;
use sentinel_worker::{TaskDriver, WorkerContext};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let matches = Command::new("sentinel")
        .version("0.1.0")
        .about("监控平台的分布式任务执行引擎")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("配置文件路径"),
        )
        .arg(
            Arg::new("worker-id")
                .long("worker-id")
                .value_name("ID")
                .help("Worker标识（缺省为 主机名-进程号）"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("日志级别")
                .value_parser(["trace", "debug", "info", "warn", "error"]),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("日志格式")
                .value_parser(["json", "pretty"]),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config").map(String::as_str);

    // 加载配置，命令行参数优先于配置文件
    let mut config = AppConfig::load(config_path)
        .with_context(|| format!("加载配置失败: {}", config_path.unwrap_or("默认路径")))?;

    if let Some(id) = matches.get_one::<String>("worker-id") {
        config.worker.worker_id = id.clone();
    }
    if let Some(level) = matches.get_one::<String>("log-level") {
        config.log.level = level.clone();
    }
    if let Some(format) = matches.get_one::<String>("log-format") {
        config.log.format = format.clone();
    }

    logging::init_logging(&config.log)?;

    if config.worker.worker_id.is_empty() {
        config.worker.worker_id = default_worker_id();
    }

    info!("启动任务执行引擎");
    info!("Worker ID: {}", config.worker.worker_id);
    info!("数据库: {}", config.database.url);

    // 数据库连接与表结构初始化
    let pool = DatabasePool::connect(&config.database)
        .await
        .context("建立数据库连接池失败")?;
    pool.migrate().await.context("初始化表结构失败")?;
    pool.health_check().await.context("数据库健康检查失败")?;

    // 装配执行器注册表（启动后只读）
    let mut registry = RunnerRegistry::new();
    register_builtin_runners(&mut registry).context("注册内置执行器失败")?;
    info!("已注册任务类型: {:?}", registry.registered_types());

    let ctx = Arc::new(WorkerContext::new(
        config.worker.worker_id.clone(),
        pool.task_repository(),
        Arc::new(registry),
        config.worker.clone(),
    ));

    let driver = TaskDriver::new(ctx);
    driver.start().await.context("启动任务驱动器失败")?;

    wait_for_shutdown_signal().await;
    info!("收到关闭信号，开始优雅关闭...");

    if let Err(e) = driver.stop().await {
        error!("停止任务驱动器失败: {e}");
    }

    info!("任务执行引擎已退出");
    Ok(())
}

fn default_worker_id() -> String {
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown-host".to_string());
    format!("{}-{}", host, std::process::id())
}

/// 等待 Ctrl+C 或 SIGTERM
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("安装Ctrl+C监听失败");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("安装SIGTERM监听失败")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
