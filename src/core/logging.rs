//! 日志初始化
//!
//! 桥接层本身只通过 `tracing` 宏输出日志，是否以及如何输出由宿主决定。
//! 宿主没有自己的订阅者时，可以调用 [`init_logging`] 安装一个 `fmt` 订阅者。

use tracing_subscriber::EnvFilter;

use crate::config::{LogLevel, LoggingConfig};

/// 初始化日志系统
///
/// 如果全局订阅者已经存在则保持不变，返回 `false`。
pub fn init_logging(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_new(config.directive())
        .unwrap_or_else(|_| EnvFilter::new(LogLevel::Info.as_str()));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(target: "scripting", level = config.level.as_str(), "logging initialised");
    }
    installed
}
