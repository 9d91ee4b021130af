//! 统一错误处理模块
//!
//! 桥接层的错误分为两类：
//!
//! - **形状错误** (参数类型不对、回调对象缺少方法、未知关节定义)：在脚本侧表现为 `TypeError`
//! - **状态错误** (句柄失效、世界已释放、世界被锁定)：在脚本侧表现为普通 `Error`
//!
//! Rust 侧统一使用 [`BridgeError`]，到达脚本边界时通过 [`OrThrow`] 转换为 `rquickjs` 异常。

use rquickjs::{Ctx, Exception};
use thiserror::Error;

use crate::config::ConfigError;

/// 桥接层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    /// 参数类型不匹配
    #[error("{0}")]
    TypeMismatch(String),

    /// 回调对象缺少 `ReportFixture` 方法
    #[error("callback must have ReportFixture method")]
    MissingCallback,

    /// 不是已知的关节定义类型
    #[error("Unknown joint definition type")]
    UnknownJointDef,

    /// 形状数据无效 (顶点数量、退化多边形等)
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    /// 句柄指向的实体已经不存在
    #[error("InvalidState: {0}")]
    InvalidState(String),

    /// 世界正在分发接触回调，拒绝结构性修改
    #[error("InvalidState: world is locked during a step callback")]
    WorldLocked,

    /// 脚本执行错误
    #[error("Script error: {0}")]
    Script(String),

    /// 配置错误
    #[error("Config error: {0}")]
    Config(String),
}

impl BridgeError {
    /// 构造类型错误
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::TypeMismatch(message.into())
    }

    /// 构造状态错误
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// 是否应该以 `TypeError` 的形式抛给脚本
    pub fn is_type_error(&self) -> bool {
        matches!(
            self,
            Self::TypeMismatch(_) | Self::MissingCallback | Self::UnknownJointDef | Self::InvalidShape(_)
        )
    }

    /// 在脚本上下文中抛出对应的异常
    pub fn throw(&self, ctx: &Ctx<'_>) -> rquickjs::Error {
        let message = self.to_string();
        if self.is_type_error() {
            Exception::throw_type(ctx, &message)
        } else {
            Exception::throw_message(ctx, &message)
        }
    }
}

impl From<ConfigError> for BridgeError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// 桥接层结果类型别名
pub type BridgeResult<T> = Result<T, BridgeError>;

/// 把 [`BridgeResult`] 转换为脚本异常
pub trait OrThrow<T> {
    fn or_throw(self, ctx: &Ctx<'_>) -> rquickjs::Result<T>;
}

impl<T> OrThrow<T> for BridgeResult<T> {
    fn or_throw(self, ctx: &Ctx<'_>) -> rquickjs::Result<T> {
        self.map_err(|err| err.throw(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(BridgeError::MissingCallback.is_type_error());
        assert!(BridgeError::UnknownJointDef.is_type_error());
        assert!(BridgeError::type_mismatch("x must be a number").is_type_error());
        assert!(!BridgeError::WorldLocked.is_type_error());
        assert!(!BridgeError::invalid_state("body destroyed").is_type_error());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            BridgeError::MissingCallback.to_string(),
            "callback must have ReportFixture method"
        );
        assert_eq!(
            BridgeError::invalid_state("body has been destroyed").to_string(),
            "InvalidState: body has been destroyed"
        );
    }

    #[test]
    fn test_config_error_conversion() {
        let err: BridgeError = ConfigError::ValidationError("root_name is empty".into()).into();
        assert!(matches!(err, BridgeError::Config(_)));
    }
}
