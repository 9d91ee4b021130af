//! Vec2 与参数转换
//!
//! 脚本侧的数字是双精度，进入引擎时收窄为 `f32`。所有转换失败都抛 `TypeError`。

use glam::Vec2;
use rquickjs::class::Trace;
use rquickjs::function::Opt;
use rquickjs::{Ctx, Object, Result, Value};

use crate::core::BridgeError;

/// 抛出 `TypeError`
pub fn type_error<T>(ctx: &Ctx<'_>, message: impl Into<String>) -> Result<T> {
    Err(BridgeError::type_mismatch(message).throw(ctx))
}

/// `b2Vec2`
#[derive(Trace, Debug, Clone, Copy, PartialEq)]
#[rquickjs::class(rename = "b2Vec2")]
pub struct JsVec2 {
    x: f32,
    y: f32,
}

impl JsVec2 {
    pub fn new(v: Vec2) -> Self {
        Self { x: v.x, y: v.y }
    }

    pub fn value(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// `b2Vec2(x, y)`，缺省分量为 0
    pub fn construct<'js>(ctx: &Ctx<'js>, x: Opt<Value<'js>>, y: Opt<Value<'js>>) -> Result<Self> {
        Ok(Self {
            x: optional_number(ctx, x.0, "x", 0.0)?,
            y: optional_number(ctx, y.0, "y", 0.0)?,
        })
    }
}

#[rquickjs::methods]
impl JsVec2 {
    #[qjs(get, rename = "x")]
    pub fn get_x(&self) -> f64 {
        self.x as f64
    }

    #[qjs(set, rename = "x")]
    pub fn set_x<'js>(&mut self, value: Value<'js>) -> Result<()> {
        self.x = number(value.ctx(), &value, "x")?;
        Ok(())
    }

    #[qjs(get, rename = "y")]
    pub fn get_y(&self) -> f64 {
        self.y as f64
    }

    #[qjs(set, rename = "y")]
    pub fn set_y<'js>(&mut self, value: Value<'js>) -> Result<()> {
        self.y = number(value.ctx(), &value, "y")?;
        Ok(())
    }
}

// ===== 向量 =====

/// 从任意带数字 `x`、`y` 的对象读取向量 (包括 `b2Vec2` 宿主对象)
pub fn vec2_from_value<'js>(ctx: &Ctx<'js>, value: &Value<'js>, what: &str) -> Result<Vec2> {
    let Some(object) = value.as_object() else {
        return type_error(ctx, format!("{} must be a Vec2", what));
    };
    let x: Value = object.get("x")?;
    let y: Value = object.get("y")?;
    match (x.as_number(), y.as_number()) {
        (Some(x), Some(y)) => Ok(Vec2::new(x as f32, y as f32)),
        _ => type_error(ctx, format!("{} must be a Vec2 with numeric x and y", what)),
    }
}

/// 生成新的普通对象 `{x, y}`
pub fn vec2_to_value<'js>(ctx: &Ctx<'js>, v: Vec2) -> Result<Object<'js>> {
    let object = Object::new(ctx.clone())?;
    object.set("x", v.x as f64)?;
    object.set("y", v.y as f64)?;
    Ok(object)
}

// ===== 标量 =====

pub fn number<'js>(ctx: &Ctx<'js>, value: &Value<'js>, what: &str) -> Result<f32> {
    match value.as_number() {
        Some(n) => Ok(n as f32),
        None => type_error(ctx, format!("{} must be a number", what)),
    }
}

/// 缺省或 `undefined` 时使用默认值
pub fn optional_number<'js>(
    ctx: &Ctx<'js>,
    value: Option<Value<'js>>,
    what: &str,
    default: f32,
) -> Result<f32> {
    match value {
        Some(value) if !value.is_undefined() => number(ctx, &value, what),
        _ => Ok(default),
    }
}

pub fn boolean<'js>(ctx: &Ctx<'js>, value: &Value<'js>, what: &str) -> Result<bool> {
    match value.as_bool() {
        Some(b) => Ok(b),
        None => type_error(ctx, format!("{} must be a boolean", what)),
    }
}

/// 力/冲量方法末尾可选的 `wake` 参数，缺省为 `true`
pub fn wake_flag<'js>(ctx: &Ctx<'js>, value: Opt<Value<'js>>) -> Result<bool> {
    match value.0 {
        Some(value) if !value.is_undefined() => boolean(ctx, &value, "wake"),
        _ => Ok(true),
    }
}

/// 迭代次数等非负整数参数
pub fn count<'js>(
    ctx: &Ctx<'js>,
    value: Option<Value<'js>>,
    what: &str,
    default: usize,
) -> Result<usize> {
    let n = optional_number(ctx, value, what, default as f32)?;
    Ok(if n.is_finite() && n > 0.0 { n as usize } else { 0 })
}
