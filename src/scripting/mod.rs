//! 脚本层
//!
//! 把物理层包装成 QuickJS 宿主对象：
//!
//! - `carriers` - 句柄载体与共享定义载体
//! - `vec2` - 向量与参数转换
//! - `shapes` / `defs` / `joint_defs` - 定义包装
//! - `body` / `fixture` / `joint` - 实体包装
//! - `contact` - 接触与流形包装
//! - `listener` / `query` - 回调适配器
//! - `world` - `b2World`
//! - `api` - 根对象安装

pub mod api;
pub mod body;
pub mod carriers;
pub mod contact;
pub mod defs;
pub mod fixture;
pub mod joint;
pub mod joint_defs;
pub mod listener;
pub mod query;
pub mod shapes;
pub mod vec2;
pub mod world;

pub use api::install;

use rquickjs::{CatchResultExt, Context, FromJs, Runtime};

use crate::config::BridgeConfig;
use crate::core::{BridgeError, BridgeResult};

/// 安装好物理 API 的 QuickJS 运行时
pub struct ScriptingRuntime {
    pub runtime: Runtime,
    pub context: Context,
}

impl ScriptingRuntime {
    /// 配置不合法时返回 [`BridgeError::Config`]，不会创建运行时
    pub fn new(config: &BridgeConfig) -> BridgeResult<Self> {
        config.validate()?;
        let runtime = Runtime::new().map_err(script_error)?;
        let context = Context::full(&runtime).map_err(script_error)?;
        context
            .with(|ctx| install(&ctx, config).catch(&ctx).map_err(|e| e.to_string()))
            .map_err(BridgeError::Script)?;
        tracing::info!(target: "scripting", root = %config.api.root_name, "scripting runtime ready");
        Ok(Self { runtime, context })
    }

    /// 执行脚本并取回最后一个表达式的值
    ///
    /// 脚本抛出的异常转换为 [`BridgeError::Script`]，消息里带有异常信息。
    pub fn eval<T>(&self, code: &str) -> BridgeResult<T>
    where
        T: for<'js> FromJs<'js>,
    {
        self.context.with(|ctx| {
            ctx.eval::<T, _>(code)
                .catch(&ctx)
                .map_err(|e| BridgeError::Script(e.to_string()))
        })
    }

    /// 执行脚本，忽略结果
    pub fn run(&self, code: &str) -> BridgeResult<()> {
        self.eval::<()>(code)
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// 执行垃圾回收
    pub fn collect_garbage(&self) {
        self.runtime.run_gc();
    }
}

fn script_error(err: rquickjs::Error) -> BridgeError {
    BridgeError::Script(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_root_name_is_rejected() {
        let mut config = BridgeConfig::default();
        config.api.root_name = String::new();
        assert!(matches!(ScriptingRuntime::new(&config), Err(BridgeError::Config(_))));

        config.api.root_name = "1world".to_string();
        assert!(matches!(ScriptingRuntime::new(&config), Err(BridgeError::Config(_))));
    }

    #[test]
    fn test_install_validates_config() {
        let runtime = Runtime::new().unwrap();
        let context = Context::full(&runtime).unwrap();
        let mut config = BridgeConfig::default();
        config.simulation.motor_damping_factor = 0.0;

        let message = context.with(|ctx| {
            install(&ctx, &config)
                .catch(&ctx)
                .map_err(|e| e.to_string())
                .unwrap_err()
        });
        assert!(message.contains("motor_damping_factor"), "{}", message);
    }
}
