//! 关节包装：`b2Joint` 与 `b2MouseJoint`
//!
//! 马达相关方法按关节记录里的类型标签分发，不支持的关节上 setter 静默忽略、getter 返回 0。

use rapier2d::prelude::*;
use rquickjs::class::Trace;
use rquickjs::{Class, Ctx, FromJs, IntoJs, Object, Result, Value};

use super::body::Body;
use super::carriers::{EntityRef, StateRef};
use super::vec2::{boolean, number, type_error, vec2_from_value, vec2_to_value};
use crate::core::{BridgeResult, OrThrow};
use crate::physics::{JointKind, PhysicsState};

// ===== 公共实现 =====

fn body_a<'js>(ctx: &Ctx<'js>, entity: &EntityRef<ImpulseJointHandle>) -> Result<Value<'js>> {
    let handle = entity.read(|joint| joint.body1).or_throw(ctx)?;
    Body::wrap(ctx, entity.world(), handle)
}

fn body_b<'js>(ctx: &Ctx<'js>, entity: &EntityRef<ImpulseJointHandle>) -> Result<Value<'js>> {
    let handle = entity.read(|joint| joint.body2).or_throw(ctx)?;
    Body::wrap(ctx, entity.world(), handle)
}

fn state_op<'js, R>(
    ctx: &Ctx<'js>,
    entity: &EntityRef<ImpulseJointHandle>,
    f: impl FnOnce(&mut PhysicsState, ImpulseJointHandle) -> BridgeResult<R>,
) -> Result<R> {
    entity.with_state(f).or_throw(ctx)
}

/// 生成关节类：基础方法 + 马达方法 + 各自的方法
macro_rules! joint_class {
    ($name:ident, $js_name:literal { $($methods:tt)* }) => {
        #[derive(Trace)]
        #[rquickjs::class(rename = $js_name)]
        pub struct $name {
            entity: EntityRef<ImpulseJointHandle>,
        }

        #[rquickjs::methods]
        impl $name {
            #[qjs(rename = "GetBodyA")]
            pub fn get_body_a<'js>(&self, ctx: Ctx<'js>) -> Result<Value<'js>> {
                body_a(&ctx, &self.entity)
            }

            #[qjs(rename = "GetBodyB")]
            pub fn get_body_b<'js>(&self, ctx: Ctx<'js>) -> Result<Value<'js>> {
                body_b(&ctx, &self.entity)
            }

            #[qjs(rename = "GetType")]
            pub fn get_type<'js>(&self, ctx: Ctx<'js>) -> Result<i32> {
                state_op(&ctx, &self.entity, |state, joint| {
                    state.joint_record(joint).map(|record| record.kind.type_code())
                })
            }

            #[qjs(rename = "IsEnabled")]
            pub fn is_enabled<'js>(&self, ctx: Ctx<'js>) -> Result<bool> {
                self.entity.read(|joint| joint.data.is_enabled()).or_throw(&ctx)
            }

            #[qjs(rename = "SetMotorSpeed")]
            pub fn set_motor_speed<'js>(&self, ctx: Ctx<'js>, speed: Value<'js>) -> Result<()> {
                let speed = number(&ctx, &speed, "speed")?;
                state_op(&ctx, &self.entity, |state, joint| state.set_motor_speed(joint, speed))
            }

            #[qjs(rename = "GetMotorSpeed")]
            pub fn get_motor_speed<'js>(&self, ctx: Ctx<'js>) -> Result<f64> {
                state_op(&ctx, &self.entity, |state, joint| state.motor_speed(joint))
                    .map(|speed| speed as f64)
            }

            #[qjs(rename = "EnableMotor")]
            pub fn enable_motor<'js>(&self, ctx: Ctx<'js>, enabled: Value<'js>) -> Result<()> {
                let enabled = boolean(&ctx, &enabled, "enabled")?;
                state_op(&ctx, &self.entity, |state, joint| state.enable_motor(joint, enabled))
            }

            #[qjs(rename = "IsMotorEnabled")]
            pub fn is_motor_enabled<'js>(&self, ctx: Ctx<'js>) -> Result<bool> {
                state_op(&ctx, &self.entity, |state, joint| state.is_motor_enabled(joint))
            }

            #[qjs(rename = "SetMaxMotorTorque")]
            pub fn set_max_motor_torque<'js>(&self, ctx: Ctx<'js>, torque: Value<'js>) -> Result<()> {
                let torque = number(&ctx, &torque, "torque")?;
                state_op(&ctx, &self.entity, |state, joint| state.set_max_motor_torque(joint, torque))
            }

            $($methods)*
        }
    };
}

joint_class!(Joint, "b2Joint" {});

joint_class!(MouseJoint, "b2MouseJoint" {
    #[qjs(rename = "SetTarget")]
    pub fn set_target<'js>(&self, ctx: Ctx<'js>, target: Value<'js>) -> Result<()> {
        let target = vec2_from_value(&ctx, &target, "target")?;
        state_op(&ctx, &self.entity, |state, joint| state.set_mouse_target(joint, target))
    }

    #[qjs(rename = "GetTarget")]
    pub fn get_target<'js>(&self, ctx: Ctx<'js>) -> Result<Object<'js>> {
        let target = state_op(&ctx, &self.entity, |state, joint| state.mouse_target(joint))?;
        vec2_to_value(&ctx, target)
    }

    #[qjs(rename = "SetMaxForce")]
    pub fn set_max_force<'js>(&self, ctx: Ctx<'js>, force: Value<'js>) -> Result<()> {
        let force = number(&ctx, &force, "force")?;
        state_op(&ctx, &self.entity, |state, joint| state.set_mouse_max_force(joint, force))
    }

    #[qjs(rename = "GetMaxForce")]
    pub fn get_max_force<'js>(&self, ctx: Ctx<'js>) -> Result<f64> {
        state_op(&ctx, &self.entity, |state, joint| state.mouse_max_force(joint))
            .map(|force| force as f64)
    }
});

// ===== 转换 =====

/// 按关节类型生成宿主对象：鼠标关节用 `b2MouseJoint`，其余用 `b2Joint`
pub fn wrap_joint<'js>(
    ctx: &Ctx<'js>,
    world: &StateRef,
    handle: ImpulseJointHandle,
    kind: JointKind,
) -> Result<Value<'js>> {
    let entity = EntityRef::from_world(world, handle);
    match kind {
        JointKind::Mouse => Class::instance(ctx.clone(), MouseJoint { entity })?.into_js(ctx),
        _ => Class::instance(ctx.clone(), Joint { entity })?.into_js(ctx),
    }
}

/// 从 `b2Joint` 或 `b2MouseJoint` 宿主对象取出句柄
pub fn joint_from_value<'js>(
    ctx: &Ctx<'js>,
    value: &Value<'js>,
    what: &str,
) -> Result<EntityRef<ImpulseJointHandle>> {
    if let Ok(joint) = Class::<Joint>::from_js(ctx, value.clone()) {
        return Ok(joint.borrow().entity.clone());
    }
    if let Ok(joint) = Class::<MouseJoint>::from_js(ctx, value.clone()) {
        return Ok(joint.borrow().entity.clone());
    }
    type_error(ctx, format!("{} must be a b2Joint", what))
}
