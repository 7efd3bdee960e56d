//! 日志系统模块
//!
//! 基于 `tracing` 提供结构化的日志记录功能。
//!
//! 构建脚本的 stdout 专门用于 `cargo:` 指令，因此所有日志都写到 stderr
//! （cargo 在构建失败或 `-vv` 时会显示），可选同时写入滚动日志文件。
//!
//! # 使用示例
//!
//! ```no_run
//! use sokol_build::core::config::LogLevel;
//! use sokol_build::core::log;
//!
//! log::init_logger(LogLevel::Info, false, None)?;
//! tracing::info!(backend = "glcore33", "Backend selected");
//! # Ok::<(), sokol_build::core::SokolBuildError>(())
//! ```

use std::path::Path;
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use super::config::{LogLevel, LoggingConfig};
use super::error::{Result, SokolBuildError};

/// 初始化日志系统
///
/// 可以重复调用：同一进程中已有全局 subscriber 时返回 `Log` 错误，
/// 调用方通常忽略它（例如一个构建脚本里驱动了多次组装）。
///
/// `RUST_LOG` 存在时优先于 `level`。
pub fn init_logger(level: LogLevel, file_output: bool, log_file_path: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_name(level)));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_ansi(false)
        .with_writer(std::io::stderr);

    let result = if file_output {
        // 解析日志文件路径
        let log_path = log_file_path.unwrap_or("sokol_build.log");
        let path = Path::new(log_path);
        let directory = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        let filename = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("sokol_build.log");

        // 创建滚动文件 appender（每天滚动）
        let file_appender = RollingFileAppender::new(Rotation::DAILY, directory, filename);

        let file_layer = fmt::layer()
            .with_target(true)
            .with_ansi(false) // 文件不需要 ANSI 颜色
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(filter)
            .with(console_layer)
            .with(file_layer)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(console_layer)
            .try_init()
    };

    result.map_err(|e| SokolBuildError::Log(e.to_string()))
}

/// 按配置初始化
pub fn init_from_config(config: &LoggingConfig) -> Result<()> {
    let log_file = config.file_output.then_some(config.log_file.as_str());
    init_logger(config.level, config.file_output, log_file)
}

fn level_name(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Trace => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    }
}

/// 日志级别转换
impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}
