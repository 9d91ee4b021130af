//! 关节定义包装
//!
//! 六种定义共享 `bodyA`、`bodyB`、`collideConnected` 三个属性，由 `joint_def_class!`
//! 统一生成；CreateJoint 通过 [`joint_spec_from_value`] 按宿主对象的具体类型分发。

use glam::Vec2;
use rapier2d::prelude::*;
use rquickjs::class::Trace;
use rquickjs::{Class, Ctx, FromJs, Object, Result, Value};

use super::body::{body_from_value, Body};
use super::carriers::{EntityRef, SharedDef, SharedState};
use super::vec2::{boolean, number, vec2_from_value, vec2_to_value};
use crate::core::{BridgeError, BridgeResult, OrThrow};
use crate::physics::{
    from_point, from_vector, to_point, to_vector, DistanceSpec, JointBase, JointSpec, MouseSpec,
    PrismaticSpec, RevoluteSpec, WeldSpec, WheelSpec,
};

/// `b2JointDef` 的公共字段
#[derive(Clone, Default)]
pub struct JointDefBase {
    pub body_a: Option<EntityRef<RigidBodyHandle>>,
    pub body_b: Option<EntityRef<RigidBodyHandle>>,
    pub collide_connected: bool,
}

impl JointDefBase {
    /// 解析两个刚体句柄，要求都属于 `state` 且仍然存活
    pub fn resolve(&self, state: &SharedState) -> BridgeResult<JointBase> {
        let body_a = self
            .body_a
            .as_ref()
            .ok_or_else(|| BridgeError::type_mismatch("joint definition bodyA is not set"))?
            .ensure_in(state)?;
        let body_b = self
            .body_b
            .as_ref()
            .ok_or_else(|| BridgeError::type_mismatch("joint definition bodyB is not set"))?
            .ensure_in(state)?;
        Ok(JointBase {
            body_a,
            body_b,
            collide_connected: self.collide_connected,
        })
    }
}

#[derive(Clone, Default)]
pub struct RevoluteDefData {
    pub base: JointDefBase,
    pub spec: RevoluteSpec,
}

#[derive(Clone, Default)]
pub struct PrismaticDefData {
    pub base: JointDefBase,
    pub spec: PrismaticSpec,
    /// 只做记录，平移关节不使用参考角
    pub reference_angle: Real,
}

#[derive(Clone, Default)]
pub struct DistanceDefData {
    pub base: JointDefBase,
    pub spec: DistanceSpec,
}

#[derive(Clone, Default)]
pub struct MouseDefData {
    pub base: JointDefBase,
    pub spec: MouseSpec,
}

#[derive(Clone, Default)]
pub struct WheelDefData {
    pub base: JointDefBase,
    pub spec: WheelSpec,
}

#[derive(Clone, Default)]
pub struct WeldDefData {
    pub base: JointDefBase,
    pub spec: WeldSpec,
}

// ===== 辅助函数 =====

fn body_value<'js>(ctx: &Ctx<'js>, body: Option<EntityRef<RigidBodyHandle>>) -> Result<Value<'js>> {
    match body {
        Some(entity) => Body::from_entity(ctx, entity),
        None => Ok(Value::new_undefined(ctx.clone())),
    }
}

fn body_pose<'js>(ctx: &Ctx<'js>, body: &EntityRef<RigidBodyHandle>) -> Result<Isometry<Real>> {
    body.read(|b| *b.position()).or_throw(ctx)
}

fn local_point(pose: &Isometry<Real>, world: Vec2) -> Vec2 {
    from_point(&pose.inverse_transform_point(&to_point(world)))
}

fn local_vector(pose: &Isometry<Real>, world: Vec2) -> Vec2 {
    from_vector(&pose.inverse_transform_vector(&to_vector(world)))
}

fn set_number<'js, T>(
    def: &SharedDef<T>,
    value: &Value<'js>,
    what: &str,
    apply: impl FnOnce(&mut T, f32),
) -> Result<()> {
    let n = number(value.ctx(), value, what)?;
    def.update(|d| apply(d, n));
    Ok(())
}

fn set_bool<'js, T>(
    def: &SharedDef<T>,
    value: &Value<'js>,
    what: &str,
    apply: impl FnOnce(&mut T, bool),
) -> Result<()> {
    let b = boolean(value.ctx(), value, what)?;
    def.update(|d| apply(d, b));
    Ok(())
}

fn set_vec2<'js, T>(
    def: &SharedDef<T>,
    value: &Value<'js>,
    what: &str,
    apply: impl FnOnce(&mut T, Vec2),
) -> Result<()> {
    let v = vec2_from_value(value.ctx(), value, what)?;
    def.update(|d| apply(d, v));
    Ok(())
}

/// 生成关节定义类：公共属性 + 各自的属性
macro_rules! joint_def_class {
    ($name:ident, $js_name:literal, $data:ident { $($methods:tt)* }) => {
        #[derive(Trace)]
        #[rquickjs::class(rename = $js_name)]
        pub struct $name {
            def: SharedDef<$data>,
        }

        impl $name {
            pub fn new() -> Self {
                Self { def: SharedDef::new($data::default()) }
            }

            pub fn data(&self) -> $data {
                self.def.snapshot()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        #[rquickjs::methods]
        impl $name {
            #[qjs(get, rename = "bodyA")]
            pub fn body_a<'js>(&self, ctx: Ctx<'js>) -> Result<Value<'js>> {
                let body = self.def.get().base.body_a.clone();
                body_value(&ctx, body)
            }

            #[qjs(set, rename = "bodyA")]
            pub fn set_body_a<'js>(&self, value: Value<'js>) -> Result<()> {
                let body = body_from_value(value.ctx(), &value, "bodyA")?;
                self.def.update(|d| d.base.body_a = Some(body));
                Ok(())
            }

            #[qjs(get, rename = "bodyB")]
            pub fn body_b<'js>(&self, ctx: Ctx<'js>) -> Result<Value<'js>> {
                let body = self.def.get().base.body_b.clone();
                body_value(&ctx, body)
            }

            #[qjs(set, rename = "bodyB")]
            pub fn set_body_b<'js>(&self, value: Value<'js>) -> Result<()> {
                let body = body_from_value(value.ctx(), &value, "bodyB")?;
                self.def.update(|d| d.base.body_b = Some(body));
                Ok(())
            }

            #[qjs(get, rename = "collideConnected")]
            pub fn collide_connected(&self) -> bool {
                self.def.get().base.collide_connected
            }

            #[qjs(set, rename = "collideConnected")]
            pub fn set_collide_connected<'js>(&self, value: Value<'js>) -> Result<()> {
                set_bool(&self.def, &value, "collideConnected", |d, b| d.base.collide_connected = b)
            }

            $($methods)*
        }
    };
}

// ===== b2RevoluteJointDef =====

joint_def_class!(RevoluteJointDef, "b2RevoluteJointDef", RevoluteDefData {
    #[qjs(rename = "Initialize")]
    pub fn initialize<'js>(
        &self,
        ctx: Ctx<'js>,
        body_a: Value<'js>,
        body_b: Value<'js>,
        anchor: Value<'js>,
    ) -> Result<()> {
        let body_a = body_from_value(&ctx, &body_a, "bodyA")?;
        let body_b = body_from_value(&ctx, &body_b, "bodyB")?;
        let anchor = vec2_from_value(&ctx, &anchor, "anchor")?;
        let (pose_a, pose_b) = (body_pose(&ctx, &body_a)?, body_pose(&ctx, &body_b)?);
        self.def.update(|d| {
            d.spec.local_anchor_a = local_point(&pose_a, anchor);
            d.spec.local_anchor_b = local_point(&pose_b, anchor);
            d.spec.reference_angle = pose_b.rotation.angle() - pose_a.rotation.angle();
            d.base.body_a = Some(body_a);
            d.base.body_b = Some(body_b);
        });
        Ok(())
    }

    #[qjs(get, rename = "localAnchorA")]
    pub fn local_anchor_a<'js>(&self, ctx: Ctx<'js>) -> Result<Object<'js>> {
        vec2_to_value(&ctx, self.def.get().spec.local_anchor_a)
    }

    #[qjs(set, rename = "localAnchorA")]
    pub fn set_local_anchor_a<'js>(&self, value: Value<'js>) -> Result<()> {
        set_vec2(&self.def, &value, "localAnchorA", |d, v| d.spec.local_anchor_a = v)
    }

    #[qjs(get, rename = "localAnchorB")]
    pub fn local_anchor_b<'js>(&self, ctx: Ctx<'js>) -> Result<Object<'js>> {
        vec2_to_value(&ctx, self.def.get().spec.local_anchor_b)
    }

    #[qjs(set, rename = "localAnchorB")]
    pub fn set_local_anchor_b<'js>(&self, value: Value<'js>) -> Result<()> {
        set_vec2(&self.def, &value, "localAnchorB", |d, v| d.spec.local_anchor_b = v)
    }

    #[qjs(get, rename = "referenceAngle")]
    pub fn reference_angle(&self) -> f64 {
        self.def.get().spec.reference_angle as f64
    }

    #[qjs(set, rename = "referenceAngle")]
    pub fn set_reference_angle<'js>(&self, value: Value<'js>) -> Result<()> {
        set_number(&self.def, &value, "referenceAngle", |d, n| d.spec.reference_angle = n)
    }

    #[qjs(get, rename = "enableLimit")]
    pub fn enable_limit(&self) -> bool {
        self.def.get().spec.enable_limit
    }

    #[qjs(set, rename = "enableLimit")]
    pub fn set_enable_limit<'js>(&self, value: Value<'js>) -> Result<()> {
        set_bool(&self.def, &value, "enableLimit", |d, b| d.spec.enable_limit = b)
    }

    #[qjs(get, rename = "lowerAngle")]
    pub fn lower_angle(&self) -> f64 {
        self.def.get().spec.lower_angle as f64
    }

    #[qjs(set, rename = "lowerAngle")]
    pub fn set_lower_angle<'js>(&self, value: Value<'js>) -> Result<()> {
        set_number(&self.def, &value, "lowerAngle", |d, n| d.spec.lower_angle = n)
    }

    #[qjs(get, rename = "upperAngle")]
    pub fn upper_angle(&self) -> f64 {
        self.def.get().spec.upper_angle as f64
    }

    #[qjs(set, rename = "upperAngle")]
    pub fn set_upper_angle<'js>(&self, value: Value<'js>) -> Result<()> {
        set_number(&self.def, &value, "upperAngle", |d, n| d.spec.upper_angle = n)
    }

    #[qjs(get, rename = "enableMotor")]
    pub fn enable_motor(&self) -> bool {
        self.def.get().spec.motor.enabled
    }

    #[qjs(set, rename = "enableMotor")]
    pub fn set_enable_motor<'js>(&self, value: Value<'js>) -> Result<()> {
        set_bool(&self.def, &value, "enableMotor", |d, b| d.spec.motor.enabled = b)
    }

    #[qjs(get, rename = "motorSpeed")]
    pub fn motor_speed(&self) -> f64 {
        self.def.get().spec.motor.speed as f64
    }

    #[qjs(set, rename = "motorSpeed")]
    pub fn set_motor_speed<'js>(&self, value: Value<'js>) -> Result<()> {
        set_number(&self.def, &value, "motorSpeed", |d, n| d.spec.motor.speed = n)
    }

    #[qjs(get, rename = "maxMotorTorque")]
    pub fn max_motor_torque(&self) -> f64 {
        self.def.get().spec.motor.max_effort as f64
    }

    #[qjs(set, rename = "maxMotorTorque")]
    pub fn set_max_motor_torque<'js>(&self, value: Value<'js>) -> Result<()> {
        set_number(&self.def, &value, "maxMotorTorque", |d, n| d.spec.motor.max_effort = n)
    }
});

// ===== b2PrismaticJointDef =====

joint_def_class!(PrismaticJointDef, "b2PrismaticJointDef", PrismaticDefData {
    #[qjs(rename = "Initialize")]
    pub fn initialize<'js>(
        &self,
        ctx: Ctx<'js>,
        body_a: Value<'js>,
        body_b: Value<'js>,
        anchor: Value<'js>,
        axis: Value<'js>,
    ) -> Result<()> {
        let body_a = body_from_value(&ctx, &body_a, "bodyA")?;
        let body_b = body_from_value(&ctx, &body_b, "bodyB")?;
        let anchor = vec2_from_value(&ctx, &anchor, "anchor")?;
        let axis = vec2_from_value(&ctx, &axis, "axis")?;
        let (pose_a, pose_b) = (body_pose(&ctx, &body_a)?, body_pose(&ctx, &body_b)?);
        self.def.update(|d| {
            d.spec.local_anchor_a = local_point(&pose_a, anchor);
            d.spec.local_anchor_b = local_point(&pose_b, anchor);
            d.spec.local_axis_a = local_vector(&pose_a, axis).normalize_or_zero();
            d.reference_angle = pose_b.rotation.angle() - pose_a.rotation.angle();
            d.base.body_a = Some(body_a);
            d.base.body_b = Some(body_b);
        });
        Ok(())
    }

    #[qjs(get, rename = "localAnchorA")]
    pub fn local_anchor_a<'js>(&self, ctx: Ctx<'js>) -> Result<Object<'js>> {
        vec2_to_value(&ctx, self.def.get().spec.local_anchor_a)
    }

    #[qjs(set, rename = "localAnchorA")]
    pub fn set_local_anchor_a<'js>(&self, value: Value<'js>) -> Result<()> {
        set_vec2(&self.def, &value, "localAnchorA", |d, v| d.spec.local_anchor_a = v)
    }

    #[qjs(get, rename = "localAnchorB")]
    pub fn local_anchor_b<'js>(&self, ctx: Ctx<'js>) -> Result<Object<'js>> {
        vec2_to_value(&ctx, self.def.get().spec.local_anchor_b)
    }

    #[qjs(set, rename = "localAnchorB")]
    pub fn set_local_anchor_b<'js>(&self, value: Value<'js>) -> Result<()> {
        set_vec2(&self.def, &value, "localAnchorB", |d, v| d.spec.local_anchor_b = v)
    }

    #[qjs(get, rename = "localAxisA")]
    pub fn local_axis_a<'js>(&self, ctx: Ctx<'js>) -> Result<Object<'js>> {
        vec2_to_value(&ctx, self.def.get().spec.local_axis_a)
    }

    #[qjs(set, rename = "localAxisA")]
    pub fn set_local_axis_a<'js>(&self, value: Value<'js>) -> Result<()> {
        set_vec2(&self.def, &value, "localAxisA", |d, v| d.spec.local_axis_a = v)
    }

    #[qjs(get, rename = "referenceAngle")]
    pub fn reference_angle(&self) -> f64 {
        self.def.get().reference_angle as f64
    }

    #[qjs(set, rename = "referenceAngle")]
    pub fn set_reference_angle<'js>(&self, value: Value<'js>) -> Result<()> {
        set_number(&self.def, &value, "referenceAngle", |d, n| d.reference_angle = n)
    }

    #[qjs(get, rename = "enableLimit")]
    pub fn enable_limit(&self) -> bool {
        self.def.get().spec.enable_limit
    }

    #[qjs(set, rename = "enableLimit")]
    pub fn set_enable_limit<'js>(&self, value: Value<'js>) -> Result<()> {
        set_bool(&self.def, &value, "enableLimit", |d, b| d.spec.enable_limit = b)
    }

    #[qjs(get, rename = "lowerTranslation")]
    pub fn lower_translation(&self) -> f64 {
        self.def.get().spec.lower_translation as f64
    }

    #[qjs(set, rename = "lowerTranslation")]
    pub fn set_lower_translation<'js>(&self, value: Value<'js>) -> Result<()> {
        set_number(&self.def, &value, "lowerTranslation", |d, n| d.spec.lower_translation = n)
    }

    #[qjs(get, rename = "upperTranslation")]
    pub fn upper_translation(&self) -> f64 {
        self.def.get().spec.upper_translation as f64
    }

    #[qjs(set, rename = "upperTranslation")]
    pub fn set_upper_translation<'js>(&self, value: Value<'js>) -> Result<()> {
        set_number(&self.def, &value, "upperTranslation", |d, n| d.spec.upper_translation = n)
    }

    #[qjs(get, rename = "enableMotor")]
    pub fn enable_motor(&self) -> bool {
        self.def.get().spec.motor.enabled
    }

    #[qjs(set, rename = "enableMotor")]
    pub fn set_enable_motor<'js>(&self, value: Value<'js>) -> Result<()> {
        set_bool(&self.def, &value, "enableMotor", |d, b| d.spec.motor.enabled = b)
    }

    #[qjs(get, rename = "motorSpeed")]
    pub fn motor_speed(&self) -> f64 {
        self.def.get().spec.motor.speed as f64
    }

    #[qjs(set, rename = "motorSpeed")]
    pub fn set_motor_speed<'js>(&self, value: Value<'js>) -> Result<()> {
        set_number(&self.def, &value, "motorSpeed", |d, n| d.spec.motor.speed = n)
    }

    #[qjs(get, rename = "maxMotorForce")]
    pub fn max_motor_force(&self) -> f64 {
        self.def.get().spec.motor.max_effort as f64
    }

    #[qjs(set, rename = "maxMotorForce")]
    pub fn set_max_motor_force<'js>(&self, value: Value<'js>) -> Result<()> {
        set_number(&self.def, &value, "maxMotorForce", |d, n| d.spec.motor.max_effort = n)
    }
});

// ===== b2DistanceJointDef =====

joint_def_class!(DistanceJointDef, "b2DistanceJointDef", DistanceDefData {
    /// 锚点取世界坐标，三个长度都设为锚点间距
    #[qjs(rename = "Initialize")]
    pub fn initialize<'js>(
        &self,
        ctx: Ctx<'js>,
        body_a: Value<'js>,
        body_b: Value<'js>,
        anchor_a: Value<'js>,
        anchor_b: Value<'js>,
    ) -> Result<()> {
        let body_a = body_from_value(&ctx, &body_a, "bodyA")?;
        let body_b = body_from_value(&ctx, &body_b, "bodyB")?;
        let anchor_a = vec2_from_value(&ctx, &anchor_a, "anchorA")?;
        let anchor_b = vec2_from_value(&ctx, &anchor_b, "anchorB")?;
        let (pose_a, pose_b) = (body_pose(&ctx, &body_a)?, body_pose(&ctx, &body_b)?);
        let length = anchor_a.distance(anchor_b);
        self.def.update(|d| {
            d.spec.local_anchor_a = local_point(&pose_a, anchor_a);
            d.spec.local_anchor_b = local_point(&pose_b, anchor_b);
            d.spec.length = length;
            d.spec.min_length = length;
            d.spec.max_length = length;
            d.base.body_a = Some(body_a);
            d.base.body_b = Some(body_b);
        });
        Ok(())
    }

    #[qjs(get, rename = "localAnchorA")]
    pub fn local_anchor_a<'js>(&self, ctx: Ctx<'js>) -> Result<Object<'js>> {
        vec2_to_value(&ctx, self.def.get().spec.local_anchor_a)
    }

    #[qjs(set, rename = "localAnchorA")]
    pub fn set_local_anchor_a<'js>(&self, value: Value<'js>) -> Result<()> {
        set_vec2(&self.def, &value, "localAnchorA", |d, v| d.spec.local_anchor_a = v)
    }

    #[qjs(get, rename = "localAnchorB")]
    pub fn local_anchor_b<'js>(&self, ctx: Ctx<'js>) -> Result<Object<'js>> {
        vec2_to_value(&ctx, self.def.get().spec.local_anchor_b)
    }

    #[qjs(set, rename = "localAnchorB")]
    pub fn set_local_anchor_b<'js>(&self, value: Value<'js>) -> Result<()> {
        set_vec2(&self.def, &value, "localAnchorB", |d, v| d.spec.local_anchor_b = v)
    }

    #[qjs(get, rename = "length")]
    pub fn length(&self) -> f64 {
        self.def.get().spec.length as f64
    }

    #[qjs(set, rename = "length")]
    pub fn set_length<'js>(&self, value: Value<'js>) -> Result<()> {
        set_number(&self.def, &value, "length", |d, n| d.spec.length = n)
    }

    #[qjs(get, rename = "minLength")]
    pub fn min_length(&self) -> f64 {
        self.def.get().spec.min_length as f64
    }

    #[qjs(set, rename = "minLength")]
    pub fn set_min_length<'js>(&self, value: Value<'js>) -> Result<()> {
        set_number(&self.def, &value, "minLength", |d, n| d.spec.min_length = n)
    }

    #[qjs(get, rename = "maxLength")]
    pub fn max_length(&self) -> f64 {
        self.def.get().spec.max_length as f64
    }

    #[qjs(set, rename = "maxLength")]
    pub fn set_max_length<'js>(&self, value: Value<'js>) -> Result<()> {
        set_number(&self.def, &value, "maxLength", |d, n| d.spec.max_length = n)
    }

    #[qjs(get, rename = "stiffness")]
    pub fn stiffness(&self) -> f64 {
        self.def.get().spec.stiffness as f64
    }

    #[qjs(set, rename = "stiffness")]
    pub fn set_stiffness<'js>(&self, value: Value<'js>) -> Result<()> {
        set_number(&self.def, &value, "stiffness", |d, n| d.spec.stiffness = n)
    }

    #[qjs(get, rename = "damping")]
    pub fn damping(&self) -> f64 {
        self.def.get().spec.damping as f64
    }

    #[qjs(set, rename = "damping")]
    pub fn set_damping<'js>(&self, value: Value<'js>) -> Result<()> {
        set_number(&self.def, &value, "damping", |d, n| d.spec.damping = n)
    }
});

// ===== b2MouseJointDef =====

joint_def_class!(MouseJointDef, "b2MouseJointDef", MouseDefData {
    #[qjs(get, rename = "target")]
    pub fn target<'js>(&self, ctx: Ctx<'js>) -> Result<Object<'js>> {
        vec2_to_value(&ctx, self.def.get().spec.target)
    }

    #[qjs(set, rename = "target")]
    pub fn set_target<'js>(&self, value: Value<'js>) -> Result<()> {
        set_vec2(&self.def, &value, "target", |d, v| d.spec.target = v)
    }

    #[qjs(get, rename = "maxForce")]
    pub fn max_force(&self) -> f64 {
        self.def.get().spec.max_force as f64
    }

    #[qjs(set, rename = "maxForce")]
    pub fn set_max_force<'js>(&self, value: Value<'js>) -> Result<()> {
        set_number(&self.def, &value, "maxForce", |d, n| d.spec.max_force = n)
    }

    #[qjs(get, rename = "stiffness")]
    pub fn stiffness(&self) -> f64 {
        self.def.get().spec.stiffness as f64
    }

    #[qjs(set, rename = "stiffness")]
    pub fn set_stiffness<'js>(&self, value: Value<'js>) -> Result<()> {
        set_number(&self.def, &value, "stiffness", |d, n| d.spec.stiffness = n)
    }

    #[qjs(get, rename = "damping")]
    pub fn damping(&self) -> f64 {
        self.def.get().spec.damping as f64
    }

    #[qjs(set, rename = "damping")]
    pub fn set_damping<'js>(&self, value: Value<'js>) -> Result<()> {
        set_number(&self.def, &value, "damping", |d, n| d.spec.damping = n)
    }
});

// ===== b2WheelJointDef =====

joint_def_class!(WheelJointDef, "b2WheelJointDef", WheelDefData {
    /// 锚点通常取轮子中心，轴线是悬挂方向
    #[qjs(rename = "Initialize")]
    pub fn initialize<'js>(
        &self,
        ctx: Ctx<'js>,
        body_a: Value<'js>,
        body_b: Value<'js>,
        anchor: Value<'js>,
        axis: Value<'js>,
    ) -> Result<()> {
        let body_a = body_from_value(&ctx, &body_a, "bodyA")?;
        let body_b = body_from_value(&ctx, &body_b, "bodyB")?;
        let anchor = vec2_from_value(&ctx, &anchor, "anchor")?;
        let axis = vec2_from_value(&ctx, &axis, "axis")?;
        let (pose_a, pose_b) = (body_pose(&ctx, &body_a)?, body_pose(&ctx, &body_b)?);
        self.def.update(|d| {
            d.spec.local_anchor_a = local_point(&pose_a, anchor);
            d.spec.local_anchor_b = local_point(&pose_b, anchor);
            d.spec.local_axis_a = local_vector(&pose_a, axis).normalize_or_zero();
            d.base.body_a = Some(body_a);
            d.base.body_b = Some(body_b);
        });
        Ok(())
    }

    #[qjs(get, rename = "localAnchorA")]
    pub fn local_anchor_a<'js>(&self, ctx: Ctx<'js>) -> Result<Object<'js>> {
        vec2_to_value(&ctx, self.def.get().spec.local_anchor_a)
    }

    #[qjs(set, rename = "localAnchorA")]
    pub fn set_local_anchor_a<'js>(&self, value: Value<'js>) -> Result<()> {
        set_vec2(&self.def, &value, "localAnchorA", |d, v| d.spec.local_anchor_a = v)
    }

    #[qjs(get, rename = "localAnchorB")]
    pub fn local_anchor_b<'js>(&self, ctx: Ctx<'js>) -> Result<Object<'js>> {
        vec2_to_value(&ctx, self.def.get().spec.local_anchor_b)
    }

    #[qjs(set, rename = "localAnchorB")]
    pub fn set_local_anchor_b<'js>(&self, value: Value<'js>) -> Result<()> {
        set_vec2(&self.def, &value, "localAnchorB", |d, v| d.spec.local_anchor_b = v)
    }

    #[qjs(get, rename = "localAxisA")]
    pub fn local_axis_a<'js>(&self, ctx: Ctx<'js>) -> Result<Object<'js>> {
        vec2_to_value(&ctx, self.def.get().spec.local_axis_a)
    }

    #[qjs(set, rename = "localAxisA")]
    pub fn set_local_axis_a<'js>(&self, value: Value<'js>) -> Result<()> {
        set_vec2(&self.def, &value, "localAxisA", |d, v| d.spec.local_axis_a = v)
    }

    #[qjs(get, rename = "enableLimit")]
    pub fn enable_limit(&self) -> bool {
        self.def.get().spec.enable_limit
    }

    #[qjs(set, rename = "enableLimit")]
    pub fn set_enable_limit<'js>(&self, value: Value<'js>) -> Result<()> {
        set_bool(&self.def, &value, "enableLimit", |d, b| d.spec.enable_limit = b)
    }

    #[qjs(get, rename = "lowerTranslation")]
    pub fn lower_translation(&self) -> f64 {
        self.def.get().spec.lower_translation as f64
    }

    #[qjs(set, rename = "lowerTranslation")]
    pub fn set_lower_translation<'js>(&self, value: Value<'js>) -> Result<()> {
        set_number(&self.def, &value, "lowerTranslation", |d, n| d.spec.lower_translation = n)
    }

    #[qjs(get, rename = "upperTranslation")]
    pub fn upper_translation(&self) -> f64 {
        self.def.get().spec.upper_translation as f64
    }

    #[qjs(set, rename = "upperTranslation")]
    pub fn set_upper_translation<'js>(&self, value: Value<'js>) -> Result<()> {
        set_number(&self.def, &value, "upperTranslation", |d, n| d.spec.upper_translation = n)
    }

    #[qjs(get, rename = "enableMotor")]
    pub fn enable_motor(&self) -> bool {
        self.def.get().spec.motor.enabled
    }

    #[qjs(set, rename = "enableMotor")]
    pub fn set_enable_motor<'js>(&self, value: Value<'js>) -> Result<()> {
        set_bool(&self.def, &value, "enableMotor", |d, b| d.spec.motor.enabled = b)
    }

    #[qjs(get, rename = "motorSpeed")]
    pub fn motor_speed(&self) -> f64 {
        self.def.get().spec.motor.speed as f64
    }

    #[qjs(set, rename = "motorSpeed")]
    pub fn set_motor_speed<'js>(&self, value: Value<'js>) -> Result<()> {
        set_number(&self.def, &value, "motorSpeed", |d, n| d.spec.motor.speed = n)
    }

    #[qjs(get, rename = "maxMotorTorque")]
    pub fn max_motor_torque(&self) -> f64 {
        self.def.get().spec.motor.max_effort as f64
    }

    #[qjs(set, rename = "maxMotorTorque")]
    pub fn set_max_motor_torque<'js>(&self, value: Value<'js>) -> Result<()> {
        set_number(&self.def, &value, "maxMotorTorque", |d, n| d.spec.motor.max_effort = n)
    }

    #[qjs(get, rename = "stiffness")]
    pub fn stiffness(&self) -> f64 {
        self.def.get().spec.stiffness as f64
    }

    #[qjs(set, rename = "stiffness")]
    pub fn set_stiffness<'js>(&self, value: Value<'js>) -> Result<()> {
        set_number(&self.def, &value, "stiffness", |d, n| d.spec.stiffness = n)
    }

    #[qjs(get, rename = "damping")]
    pub fn damping(&self) -> f64 {
        self.def.get().spec.damping as f64
    }

    #[qjs(set, rename = "damping")]
    pub fn set_damping<'js>(&self, value: Value<'js>) -> Result<()> {
        set_number(&self.def, &value, "damping", |d, n| d.spec.damping = n)
    }
});

// ===== b2WeldJointDef =====

joint_def_class!(WeldJointDef, "b2WeldJointDef", WeldDefData {
    #[qjs(rename = "Initialize")]
    pub fn initialize<'js>(
        &self,
        ctx: Ctx<'js>,
        body_a: Value<'js>,
        body_b: Value<'js>,
        anchor: Value<'js>,
    ) -> Result<()> {
        let body_a = body_from_value(&ctx, &body_a, "bodyA")?;
        let body_b = body_from_value(&ctx, &body_b, "bodyB")?;
        let anchor = vec2_from_value(&ctx, &anchor, "anchor")?;
        let (pose_a, pose_b) = (body_pose(&ctx, &body_a)?, body_pose(&ctx, &body_b)?);
        self.def.update(|d| {
            d.spec.local_anchor_a = local_point(&pose_a, anchor);
            d.spec.local_anchor_b = local_point(&pose_b, anchor);
            d.spec.reference_angle = pose_b.rotation.angle() - pose_a.rotation.angle();
            d.base.body_a = Some(body_a);
            d.base.body_b = Some(body_b);
        });
        Ok(())
    }

    #[qjs(get, rename = "localAnchorA")]
    pub fn local_anchor_a<'js>(&self, ctx: Ctx<'js>) -> Result<Object<'js>> {
        vec2_to_value(&ctx, self.def.get().spec.local_anchor_a)
    }

    #[qjs(set, rename = "localAnchorA")]
    pub fn set_local_anchor_a<'js>(&self, value: Value<'js>) -> Result<()> {
        set_vec2(&self.def, &value, "localAnchorA", |d, v| d.spec.local_anchor_a = v)
    }

    #[qjs(get, rename = "localAnchorB")]
    pub fn local_anchor_b<'js>(&self, ctx: Ctx<'js>) -> Result<Object<'js>> {
        vec2_to_value(&ctx, self.def.get().spec.local_anchor_b)
    }

    #[qjs(set, rename = "localAnchorB")]
    pub fn set_local_anchor_b<'js>(&self, value: Value<'js>) -> Result<()> {
        set_vec2(&self.def, &value, "localAnchorB", |d, v| d.spec.local_anchor_b = v)
    }

    #[qjs(get, rename = "referenceAngle")]
    pub fn reference_angle(&self) -> f64 {
        self.def.get().spec.reference_angle as f64
    }

    #[qjs(set, rename = "referenceAngle")]
    pub fn set_reference_angle<'js>(&self, value: Value<'js>) -> Result<()> {
        set_number(&self.def, &value, "referenceAngle", |d, n| d.spec.reference_angle = n)
    }
});

// ===== CreateJoint 分发 =====

/// 按定义宿主对象的具体类型生成关节规格；未知类型抛 `TypeError`
pub fn joint_spec_from_value<'js>(
    ctx: &Ctx<'js>,
    state: &SharedState,
    def: &Value<'js>,
) -> Result<JointSpec> {
    let spec = if let Ok(def) = Class::<RevoluteJointDef>::from_js(ctx, def.clone()) {
        let data = def.borrow().data();
        data.base.resolve(state).map(|base| JointSpec::Revolute(base, data.spec))
    } else if let Ok(def) = Class::<PrismaticJointDef>::from_js(ctx, def.clone()) {
        let data = def.borrow().data();
        data.base.resolve(state).map(|base| JointSpec::Prismatic(base, data.spec))
    } else if let Ok(def) = Class::<DistanceJointDef>::from_js(ctx, def.clone()) {
        let data = def.borrow().data();
        data.base.resolve(state).map(|base| JointSpec::Distance(base, data.spec))
    } else if let Ok(def) = Class::<MouseJointDef>::from_js(ctx, def.clone()) {
        let data = def.borrow().data();
        data.base.resolve(state).map(|base| JointSpec::Mouse(base, data.spec))
    } else if let Ok(def) = Class::<WheelJointDef>::from_js(ctx, def.clone()) {
        let data = def.borrow().data();
        data.base.resolve(state).map(|base| JointSpec::Wheel(base, data.spec))
    } else if let Ok(def) = Class::<WeldJointDef>::from_js(ctx, def.clone()) {
        let data = def.borrow().data();
        data.base.resolve(state).map(|base| JointSpec::Weld(base, data.spec))
    } else {
        Err(BridgeError::UnknownJointDef)
    };
    spec.or_throw(ctx)
}
