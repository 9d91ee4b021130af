//! # Physics2D Bridge
//!
//! 把 2D 刚体物理引擎 (Rapier) 以 Box2D 的接口形式暴露给嵌入式 QuickJS 脚本。
//!
//! ## Features
//!
//! - **Box2D 风格的宿主对象**: `b2World`、`b2Body`、`b2Fixture`、关节与定义
//! - **接触回调**: BeginContact / EndContact / PreSolve / PostSolve，回调期间世界被锁定
//! - **查询**: 射线投射与 AABB 查询，支持 Box2D 的裁剪/终止协议
//! - **句柄安全**: 实体被销毁或世界被回收后，旧包装抛出 `InvalidState` 而不是悬空
//!
//! ## Architecture
//!
//! - [`physics`]: 引擎侧状态，不依赖脚本运行时；回调接口是 trait
//! - [`scripting`]: QuickJS 包装和回调适配器
//! - [`config`]: 宿主提供的配置
//! - [`core`]: 错误、日志、公共宏
//!
//! ### Example
//!
//! ```ignore
//! use physics2d_bridge::{BridgeConfig, ScriptingRuntime};
//!
//! let runtime = ScriptingRuntime::new(&BridgeConfig::default())?;
//! let y: f64 = runtime.eval(r#"
//!     const world = Box2d.b2World(Box2d.b2Vec2(0, -10));
//!     const def = Box2d.b2BodyDef();
//!     def.type = Box2d.b2_dynamicBody;
//!     const body = world.CreateBody(def);
//!     for (let i = 0; i < 60; i++) world.Step(1 / 60, 8, 3);
//!     body.GetPosition().y
//! "#)?;
//! ```

/// Errors, logging and shared macros
pub mod core;
/// Configuration system
pub mod config;
/// Engine-side physics state
pub mod physics;
/// QuickJS host objects
pub mod scripting;

pub use crate::config::{BridgeConfig, ConfigError};
pub use crate::core::{init_logging, BridgeError, BridgeResult};
pub use crate::physics::PhysicsState;
pub use crate::scripting::{install, ScriptingRuntime};
