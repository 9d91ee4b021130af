/// 统一配置系统
///
/// 宿主在安装桥接层之前提供 TOML/JSON 配置字符串，桥接层本身不读取文件或环境变量。
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::impl_default;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 解析错误
    #[error("Config parse error: {0}")]
    ParseError(String),
    /// 验证错误
    #[error("Config validation error: {0}")]
    ValidationError(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// 桥接层主配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// 脚本入口配置
    #[serde(default)]
    pub api: ApiConfig,

    /// 模拟参数
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BridgeConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 从TOML字符串解析配置
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 从JSON字符串解析配置
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        let config: Self =
            serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 序列化为TOML
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        self.api.validate()?;
        self.simulation.validate()?;
        Ok(())
    }
}

/// 脚本入口配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// 根对象在全局命名空间中的名字
    pub root_name: String,

    /// 是否注册 `b2_staticBody` 等刚体类型常量
    pub body_type_constants: bool,
}

impl_default!(ApiConfig {
    root_name: "Box2d".to_string(),
    body_type_constants: true,
});

impl ApiConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        let mut chars = self.root_name.chars();
        let valid_start = chars
            .next()
            .map(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
            .unwrap_or(false);
        if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$') {
            return Err(ConfigError::ValidationError(format!(
                "root_name '{}' is not a valid identifier",
                self.root_name
            )));
        }
        Ok(())
    }
}

/// 模拟参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// 关节速度马达的阻尼系数
    pub motor_damping_factor: f32,

    /// 没有夹具的动态刚体使用单位质量
    pub unit_mass_fallback: bool,
}

impl_default!(SimulationConfig {
    motor_damping_factor: 1.0,
    unit_mass_fallback: true,
});

impl SimulationConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.motor_damping_factor.is_finite() && self.motor_damping_factor > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "motor_damping_factor must be positive, got {}",
                self.motor_damping_factor
            )));
        }
        Ok(())
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: LogLevel,

    /// 额外的过滤指令，例如 `"physics=trace"`
    pub filter: Option<String>,
}

impl_default!(LoggingConfig {
    level: LogLevel::Info,
    filter: None,
});

impl LoggingConfig {
    /// 生成 `EnvFilter` 指令
    pub fn directive(&self) -> String {
        match &self.filter {
            Some(extra) if !extra.trim().is_empty() => format!("{},{}", self.level.as_str(), extra),
            _ => self.level.as_str().to_string(),
        }
    }
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    /// 跟踪
    Trace,
    /// 调试
    Debug,
    /// 信息
    Info,
    /// 警告
    Warn,
    /// 错误
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.api.root_name, "Box2d");
        assert_eq!(config.simulation.motor_damping_factor, 1.0);
    }

    #[test]
    fn test_toml_serialization() {
        let config = BridgeConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        let parsed = BridgeConfig::from_toml_str(&toml_str).unwrap();
        assert_eq!(config.api.root_name, parsed.api.root_name);
        assert_eq!(config.logging.level, parsed.logging.level);
    }

    #[test]
    fn test_partial_toml() {
        let parsed = BridgeConfig::from_toml_str(
            r#"
            [api]
            root_name = "Physics"

            [logging]
            level = "Debug"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.api.root_name, "Physics");
        assert!(parsed.api.body_type_constants);
        assert_eq!(parsed.logging.level, LogLevel::Debug);
        assert!(parsed.simulation.unit_mass_fallback);
    }

    #[test]
    fn test_json_config() {
        let parsed =
            BridgeConfig::from_json_str(r#"{"simulation": {"motor_damping_factor": 0.5}}"#).unwrap();
        assert_eq!(parsed.simulation.motor_damping_factor, 0.5);
    }

    #[test]
    fn test_invalid_root_name() {
        let result = BridgeConfig::from_toml_str("[api]\nroot_name = \"1abc\"");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));

        let result = BridgeConfig::from_json_str(r#"{"api": {"root_name": ""}}"#);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_invalid_motor_factor() {
        let result = BridgeConfig::from_json_str(r#"{"simulation": {"motor_damping_factor": 0}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_logging_directive() {
        let mut logging = LoggingConfig::default();
        assert_eq!(logging.directive(), "info");
        logging.filter = Some("physics=trace".into());
        assert_eq!(logging.directive(), "info,physics=trace");
    }
}
