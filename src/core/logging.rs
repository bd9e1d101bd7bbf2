//! 日志初始化
//!
//! 使用 tracing 日志框架。日志目标统一为 `render`、`shader_cache`、
//! `animation`、`scene`、`config`，可以通过 `RUST_LOG` 精细过滤，例如
//! `RUST_LOG=shader_cache=debug,render=warn`。

use crate::config::{LogLevel, LoggingConfig};
use tracing_subscriber::EnvFilter;

impl LogLevel {
    /// 转换为 EnvFilter 指令
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// 初始化日志系统
///
/// `RUST_LOG` 存在时优先生效，否则使用配置中的级别。
/// 重复调用是安全的：已经安装的全局 subscriber 不会被替换。
pub fn init_logging(config: &LoggingConfig) {
    if !config.log_to_console {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_directive()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();

    tracing::info!(target: "render", "Logging initialized at level {:?}", config.level);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_twice() {
        let config = LoggingConfig::default();
        init_logging(&config);
        init_logging(&config);
    }

    #[test]
    fn test_level_directive() {
        assert_eq!(LogLevel::Warn.as_directive(), "warn");
        assert_eq!(LogLevel::Trace.as_directive(), "trace");
    }
}
