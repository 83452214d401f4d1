//! 日志系统
//!
//! 控制台输出加可选的文件输出。文件通过 `tracing_appender::non_blocking`
//! 由后台线程写入，返回的 `WorkerGuard` 保存在进程级的 `OnceLock` 中，
//! 进程退出时才会刷新剩余的日志。
//!
//! # 日志目标
//!
//! | 目标 | 内容 |
//! |------|------|
//! | `d3d_sandbox::engine` | 后端创建、释放、调试层消息 |
//! | `d3d_sandbox::app` | 启动、关闭、用户操作 |
//! | `d3d_sandbox::frame` | 连续渲染时每秒一次的帧统计 |
//!
//! 第三方 crate（winit 等）只输出 warn 以上，`RUST_LOG` 可以覆盖全部规则，
//! 例如 `RUST_LOG=d3d_sandbox::frame=debug`。

use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use super::config::LogLevel;
use super::error::{Result, SandboxError};

pub const ENGINE_TARGET: &str = "d3d_sandbox::engine";
pub const APP_TARGET: &str = "d3d_sandbox::app";
pub const FRAME_TARGET: &str = "d3d_sandbox::frame";

const DEFAULT_LOG_FILE: &str = "d3d_sandbox.log";

static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

impl LogLevel {
    /// 对应的 `EnvFilter` 级别
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// 配置级别对应的过滤规则
///
/// 帧统计每秒一条，只有在 debug 及以下才打开。
pub fn filter_directives(level: LogLevel) -> String {
    let frame = match level {
        LogLevel::Trace | LogLevel::Debug => "debug",
        _ => "warn",
    };
    format!("warn,d3d_sandbox={},{}={}", level.as_filter(), FRAME_TARGET, frame)
}

/// 把日志文件路径拆成目录和文件名
fn split_log_path(log_file: &str) -> (&Path, &str) {
    let path = Path::new(log_file);
    let directory = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let filename = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(DEFAULT_LOG_FILE);
    (directory, filename)
}

/// 初始化日志系统
///
/// 只能调用一次，重复调用返回 `SandboxError::Log`。
pub fn init_logger(level: LogLevel, file_output: bool, log_file: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_directives(level)));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true);

    let (file_layer, guard) = if file_output {
        let (directory, filename) = split_log_path(log_file.unwrap_or(DEFAULT_LOG_FILE));
        let appender = tracing_appender::rolling::daily(directory, filename);
        let (writer, guard) = tracing_appender::non_blocking(appender);

        let layer = fmt::layer()
            .with_target(true)
            .with_ansi(false)
            .with_writer(writer);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| SandboxError::Log(format!("Failed to install subscriber: {}", e)))?;

    if let Some(guard) = guard {
        FILE_GUARD
            .set(guard)
            .map_err(|_| SandboxError::Log("Log file writer already installed".to_string()))?;
    }

    Ok(())
}

/// 引擎日志 - Info 级别
#[macro_export]
macro_rules! engine_info {
    ($($arg:tt)*) => {
        tracing::info!(target: $crate::core::log::ENGINE_TARGET, $($arg)*)
    };
}

/// 引擎日志 - Warn 级别
#[macro_export]
macro_rules! engine_warn {
    ($($arg:tt)*) => {
        tracing::warn!(target: $crate::core::log::ENGINE_TARGET, $($arg)*)
    };
}

/// 引擎日志 - Error 级别
#[macro_export]
macro_rules! engine_error {
    ($($arg:tt)*) => {
        tracing::error!(target: $crate::core::log::ENGINE_TARGET, $($arg)*)
    };
}

/// 应用日志 - Info 级别
#[macro_export]
macro_rules! app_info {
    ($($arg:tt)*) => {
        tracing::info!(target: $crate::core::log::APP_TARGET, $($arg)*)
    };
}

/// 应用日志 - Error 级别
#[macro_export]
macro_rules! app_error {
    ($($arg:tt)*) => {
        tracing::error!(target: $crate::core::log::APP_TARGET, $($arg)*)
    };
}

/// 帧统计，debug 级别
#[macro_export]
macro_rules! frame_stats {
    ($($arg:tt)*) => {
        tracing::debug!(target: $crate::core::log::FRAME_TARGET, $($arg)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directives() {
        assert_eq!(
            filter_directives(LogLevel::Info),
            "warn,d3d_sandbox=info,d3d_sandbox::frame=warn"
        );
        assert_eq!(
            filter_directives(LogLevel::Debug),
            "warn,d3d_sandbox=debug,d3d_sandbox::frame=debug"
        );
    }

    #[test]
    fn test_filter_directives_parse() {
        for level in [LogLevel::Trace, LogLevel::Debug, LogLevel::Info, LogLevel::Warn, LogLevel::Error] {
            assert!(EnvFilter::try_new(filter_directives(level)).is_ok(), "{:?}", level);
        }
    }

    #[test]
    fn test_targets_share_crate_prefix() {
        for target in [ENGINE_TARGET, APP_TARGET, FRAME_TARGET] {
            assert!(target.starts_with("d3d_sandbox::"));
        }
    }

    #[test]
    fn test_split_log_path() {
        assert_eq!(split_log_path("logs/app.log"), (Path::new("logs"), "app.log"));
        assert_eq!(split_log_path("app.log"), (Path::new("."), "app.log"));
        assert_eq!(split_log_path("logs/"), (Path::new("."), "logs"));
    }
}
