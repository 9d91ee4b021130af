//! 脚本入口
//!
//! 在全局对象上安装一个根对象 (默认名 `Box2d`)，构造函数以普通函数的形式挂在根对象下，
//! 例如 `Box2d.b2World(gravity)`，不需要 `new`。

use rquickjs::function::Opt;
use rquickjs::{Class, Ctx, Function, Object, Result, Value};

use super::defs::{BodyDef, FixtureDef};
use super::joint_defs::{
    DistanceJointDef, MouseJointDef, PrismaticJointDef, RevoluteJointDef, WeldJointDef,
    WheelJointDef,
};
use super::listener::JsContactListener;
use super::shapes::{CircleShape, EdgeShape, PolygonShape};
use super::vec2::JsVec2;
use super::world::World;
use crate::config::BridgeConfig;
use crate::core::{BridgeError, OrThrow};

/// 注册无参数的定义构造函数
macro_rules! register_defaults {
    ($lt:lifetime, $ctx:expr, $root:expr, { $($js:literal => $ty:ty),* $(,)? }) => {
        $(
            $root.set(
                $js,
                Function::new($ctx.clone(), |ctx: Ctx<$lt>| Class::instance(ctx, <$ty>::default()))?,
            )?;
        )*
    };
}

/// 把根对象安装到全局命名空间
pub fn install<'js>(ctx: &Ctx<'js>, config: &BridgeConfig) -> Result<()> {
    config.validate().map_err(BridgeError::from).or_throw(ctx)?;
    let root = Object::new(ctx.clone())?;

    root.set(
        "b2Vec2",
        Function::new(ctx.clone(), |ctx: Ctx<'js>, x: Opt<Value<'js>>, y: Opt<Value<'js>>| {
            let vec = JsVec2::construct(&ctx, x, y)?;
            Class::instance(ctx, vec)
        })?,
    )?;

    let simulation = config.simulation.clone();
    root.set(
        "b2World",
        Function::new(ctx.clone(), move |ctx: Ctx<'js>, gravity: Opt<Value<'js>>| {
            let gravity = gravity.0.unwrap_or_else(|| Value::new_undefined(ctx.clone()));
            let world = World::construct(&ctx, &gravity, &simulation)?;
            Class::instance(ctx, world)
        })?,
    )?;

    register_defaults!('js, ctx, root, {
        "b2BodyDef" => BodyDef,
        "b2FixtureDef" => FixtureDef,
        "b2PolygonShape" => PolygonShape,
        "b2CircleShape" => CircleShape,
        "b2EdgeShape" => EdgeShape,
        "b2RevoluteJointDef" => RevoluteJointDef,
        "b2PrismaticJointDef" => PrismaticJointDef,
        "b2DistanceJointDef" => DistanceJointDef,
        "b2MouseJointDef" => MouseJointDef,
        "b2WeldJointDef" => WeldJointDef,
        "b2WheelJointDef" => WheelJointDef,
        "JSContactListener" => JsContactListener<'js>,
    });

    if config.api.body_type_constants {
        root.set("b2_staticBody", 0)?;
        root.set("b2_kinematicBody", 1)?;
        root.set("b2_dynamicBody", 2)?;
    }

    ctx.globals().set(config.api.root_name.as_str(), root)?;
    tracing::debug!(target: "scripting", root = %config.api.root_name, "physics API installed");
    Ok(())
}
