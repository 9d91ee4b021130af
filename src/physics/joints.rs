use glam::Vec2;
use rapier2d::prelude::*;

use super::world::PhysicsState;
use super::{to_point, to_vector};
use crate::core::{BridgeError, BridgeResult};
use crate::impl_default;

/// 关节类型，数值与 Box2D `b2JointType` 一致
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointKind {
    Revolute,
    Prismatic,
    Distance,
    Mouse,
    Wheel,
    Weld,
}

impl JointKind {
    /// `b2JointType` 数值
    pub fn type_code(&self) -> i32 {
        match self {
            JointKind::Revolute => 1,
            JointKind::Prismatic => 2,
            JointKind::Distance => 3,
            JointKind::Mouse => 5,
            JointKind::Wheel => 7,
            JointKind::Weld => 8,
        }
    }

    /// 是否支持马达
    pub fn supports_motor(&self) -> bool {
        matches!(self, JointKind::Revolute | JointKind::Prismatic | JointKind::Wheel)
    }

    /// 马达作用在转轴上 (`SetMaxMotorTorque` 生效)
    pub fn has_angular_motor(&self) -> bool {
        matches!(self, JointKind::Revolute | JointKind::Wheel)
    }
}

/// 马达状态
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotorState {
    pub enabled: bool,
    pub speed: Real,
    /// 旋转关节和轮子关节为最大力矩，平移关节为最大力
    pub max_effort: Real,
}

/// 关节的附加记录
///
/// Rapier 的关节数据不保存 Box2D 的类型标签和马达开关，这些由绑定层记录。
#[derive(Debug, Clone, PartialEq)]
pub struct JointRecord {
    pub kind: JointKind,
    pub motor: MotorState,
    /// 鼠标关节目标点 (世界坐标)
    pub target: Vec2,
    /// 鼠标关节最大力
    pub max_force: Real,
}

impl JointRecord {
    fn new(kind: JointKind) -> Self {
        Self {
            kind,
            motor: MotorState::default(),
            target: Vec2::ZERO,
            max_force: 0.0,
        }
    }
}

// ===== 关节规格 =====

/// 所有关节共有的字段 (`b2JointDef`)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointBase {
    pub body_a: RigidBodyHandle,
    pub body_b: RigidBodyHandle,
    pub collide_connected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RevoluteSpec {
    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    pub reference_angle: Real,
    pub enable_limit: bool,
    pub lower_angle: Real,
    pub upper_angle: Real,
    pub motor: MotorState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrismaticSpec {
    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    pub local_axis_a: Vec2,
    pub enable_limit: bool,
    pub lower_translation: Real,
    pub upper_translation: Real,
    pub motor: MotorState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistanceSpec {
    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    pub length: Real,
    pub min_length: Real,
    pub max_length: Real,
    pub stiffness: Real,
    pub damping: Real,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MouseSpec {
    pub target: Vec2,
    pub max_force: Real,
    pub stiffness: Real,
    pub damping: Real,
}

/// 轮子关节：沿 `local_axis_a` 的弹簧悬挂 + 自由转动的马达轴
#[derive(Debug, Clone, PartialEq)]
pub struct WheelSpec {
    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    pub local_axis_a: Vec2,
    pub enable_limit: bool,
    pub lower_translation: Real,
    pub upper_translation: Real,
    pub motor: MotorState,
    /// 悬挂刚度，0 表示不加弹簧
    pub stiffness: Real,
    pub damping: Real,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeldSpec {
    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    pub reference_angle: Real,
}

// Box2D 定义的默认值
impl_default!(RevoluteSpec {
    local_anchor_a: Vec2::ZERO,
    local_anchor_b: Vec2::ZERO,
    reference_angle: 0.0,
    enable_limit: false,
    lower_angle: 0.0,
    upper_angle: 0.0,
    motor: MotorState::default(),
});

impl_default!(PrismaticSpec {
    local_anchor_a: Vec2::ZERO,
    local_anchor_b: Vec2::ZERO,
    local_axis_a: Vec2::X,
    enable_limit: false,
    lower_translation: 0.0,
    upper_translation: 0.0,
    motor: MotorState::default(),
});

impl_default!(DistanceSpec {
    local_anchor_a: Vec2::ZERO,
    local_anchor_b: Vec2::ZERO,
    length: 1.0,
    min_length: 0.0,
    max_length: Real::MAX,
    stiffness: 0.0,
    damping: 0.0,
});

impl_default!(MouseSpec {
    target: Vec2::ZERO,
    max_force: 0.0,
    stiffness: 0.0,
    damping: 0.0,
});

impl_default!(WheelSpec {
    local_anchor_a: Vec2::ZERO,
    local_anchor_b: Vec2::ZERO,
    local_axis_a: Vec2::X,
    enable_limit: false,
    lower_translation: 0.0,
    upper_translation: 0.0,
    motor: MotorState::default(),
    stiffness: 0.0,
    damping: 0.0,
});

impl_default!(WeldSpec {
    local_anchor_a: Vec2::ZERO,
    local_anchor_b: Vec2::ZERO,
    reference_angle: 0.0,
});

/// 关节规格：CreateJoint 按定义类型分发后得到的带标签变体
#[derive(Debug, Clone, PartialEq)]
pub enum JointSpec {
    Revolute(JointBase, RevoluteSpec),
    Prismatic(JointBase, PrismaticSpec),
    Distance(JointBase, DistanceSpec),
    Mouse(JointBase, MouseSpec),
    Wheel(JointBase, WheelSpec),
    Weld(JointBase, WeldSpec),
}

/// Box2D `b2_linearSlop`
const LINEAR_SLOP: Real = 0.005;

impl JointSpec {
    pub fn base(&self) -> &JointBase {
        match self {
            JointSpec::Revolute(base, _)
            | JointSpec::Prismatic(base, _)
            | JointSpec::Distance(base, _)
            | JointSpec::Mouse(base, _)
            | JointSpec::Wheel(base, _)
            | JointSpec::Weld(base, _) => base,
        }
    }

    pub fn kind(&self) -> JointKind {
        match self {
            JointSpec::Revolute(..) => JointKind::Revolute,
            JointSpec::Prismatic(..) => JointKind::Prismatic,
            JointSpec::Distance(..) => JointKind::Distance,
            JointSpec::Mouse(..) => JointKind::Mouse,
            JointSpec::Wheel(..) => JointKind::Wheel,
            JointSpec::Weld(..) => JointKind::Weld,
        }
    }

    /// 转换为 Rapier 关节
    pub fn to_rapier_joint(
        &self,
        bodies: &RigidBodySet,
        motor_factor: Real,
    ) -> BridgeResult<(GenericJoint, JointRecord)> {
        let base = self.base();
        let body_a = bodies
            .get(base.body_a)
            .ok_or_else(|| BridgeError::invalid_state("joint bodyA has been destroyed"))?;
        let body_b = bodies
            .get(base.body_b)
            .ok_or_else(|| BridgeError::invalid_state("joint bodyB has been destroyed"))?;

        let mut record = JointRecord::new(self.kind());
        let mut joint: GenericJoint = match self {
            JointSpec::Revolute(_, spec) => {
                let mut builder = RevoluteJointBuilder::new();
                if spec.enable_limit {
                    builder = builder.limits([spec.lower_angle, spec.upper_angle]);
                }
                let mut joint: GenericJoint = builder.build().into();
                joint.set_local_frame1(Isometry::new(to_vector(spec.local_anchor_a), 0.0));
                joint.set_local_frame2(Isometry::new(
                    to_vector(spec.local_anchor_b),
                    -spec.reference_angle,
                ));
                record.motor = spec.motor;
                joint
            }
            JointSpec::Prismatic(_, spec) => {
                let axis_a = unit_or_x(to_vector(spec.local_axis_a));
                let world_axis = body_a.rotation() * axis_a.into_inner();
                let axis_b = unit_or_x(body_b.rotation().inverse() * world_axis);
                let mut builder = PrismaticJointBuilder::new(axis_a);
                if spec.enable_limit {
                    builder = builder.limits([spec.lower_translation, spec.upper_translation]);
                }
                let mut joint: GenericJoint = builder.build().into();
                joint.set_local_axis2(axis_b);
                joint.set_local_anchor1(to_point(spec.local_anchor_a));
                joint.set_local_anchor2(to_point(spec.local_anchor_b));
                record.motor = spec.motor;
                joint
            }
            JointSpec::Distance(_, spec) => {
                let length = spec.length.max(LINEAR_SLOP);
                let mut joint: GenericJoint = if spec.stiffness > 0.0 {
                    SpringJointBuilder::new(length, spec.stiffness, spec.damping)
                        .build()
                        .into()
                } else {
                    let min_length = spec.min_length.clamp(LINEAR_SLOP, length);
                    let max_length = spec.max_length.max(length);
                    let mut rope: GenericJoint = RopeJointBuilder::new(max_length).build().into();
                    rope.set_limits(JointAxis::LinX, [min_length, max_length]);
                    rope
                };
                joint.set_local_anchor1(to_point(spec.local_anchor_a));
                joint.set_local_anchor2(to_point(spec.local_anchor_b));
                joint
            }
            JointSpec::Mouse(_, spec) => {
                let target = to_point(spec.target);
                let mut joint = GenericJointBuilder::new(JointAxesMask::empty()).build();
                joint.set_local_anchor1(body_a.position().inverse_transform_point(&target));
                joint.set_local_anchor2(body_b.position().inverse_transform_point(&target));
                for axis in [JointAxis::LinX, JointAxis::LinY] {
                    joint.set_motor_model(axis, MotorModel::ForceBased);
                    joint.set_motor_position(axis, 0.0, spec.stiffness, spec.damping);
                    joint.set_motor_max_force(axis, spec.max_force);
                }
                record.target = spec.target;
                record.max_force = spec.max_force;
                joint
            }
            JointSpec::Wheel(_, spec) => {
                // 只锁住垂直于轴线的平移，轴向平移交给悬挂弹簧，转动交给马达
                let axis_a = unit_or_x(to_vector(spec.local_axis_a));
                let world_axis = body_a.rotation() * axis_a.into_inner();
                let axis_b = unit_or_x(body_b.rotation().inverse() * world_axis);
                let mut joint = GenericJointBuilder::new(JointAxesMask::LIN_Y)
                    .local_axis1(axis_a)
                    .local_axis2(axis_b)
                    .local_anchor1(to_point(spec.local_anchor_a))
                    .local_anchor2(to_point(spec.local_anchor_b))
                    .build();
                if spec.enable_limit {
                    joint.set_limits(JointAxis::LinX, [spec.lower_translation, spec.upper_translation]);
                }
                if spec.stiffness > 0.0 {
                    joint.set_motor_model(JointAxis::LinX, MotorModel::ForceBased);
                    joint.set_motor_position(JointAxis::LinX, 0.0, spec.stiffness, spec.damping);
                }
                record.motor = spec.motor;
                joint
            }
            JointSpec::Weld(_, spec) => {
                let mut joint: GenericJoint = FixedJointBuilder::new().build().into();
                joint.set_local_frame1(Isometry::new(to_vector(spec.local_anchor_a), 0.0));
                joint.set_local_frame2(Isometry::new(
                    to_vector(spec.local_anchor_b),
                    -spec.reference_angle,
                ));
                joint
            }
        };

        joint.set_contacts_enabled(base.collide_connected);
        apply_motor(&mut joint, &record, motor_factor);
        Ok((joint, record))
    }
}

fn unit_or_x(v: Vector<Real>) -> UnitVector<Real> {
    UnitVector::try_new(v, 1.0e-6).unwrap_or_else(Vector::<Real>::x_axis)
}

/// 把记录里的马达状态写入 Rapier 关节
pub fn apply_motor(joint: &mut GenericJoint, record: &JointRecord, factor: Real) {
    let motor = record.motor;
    let (speed, effort, factor) = if motor.enabled {
        (motor.speed, motor.max_effort, factor)
    } else {
        (0.0, 0.0, 0.0)
    };

    match record.kind {
        JointKind::Revolute => {
            if let Some(revolute) = joint.as_revolute_mut() {
                revolute
                    .set_motor_velocity(speed, factor)
                    .set_motor_max_force(effort);
            }
        }
        JointKind::Prismatic => {
            if let Some(prismatic) = joint.as_prismatic_mut() {
                prismatic
                    .set_motor_velocity(speed, factor)
                    .set_motor_max_force(effort);
            }
        }
        JointKind::Wheel => {
            joint
                .set_motor_velocity(JointAxis::AngX, speed, factor)
                .set_motor_max_force(JointAxis::AngX, effort);
        }
        _ => {}
    }
}

// ===== 关节操作 =====

impl PhysicsState {
    fn joint_parts(
        &mut self,
        handle: ImpulseJointHandle,
    ) -> BridgeResult<(&mut ImpulseJoint, &mut JointRecord)> {
        let joint = self
            .impulse_joint_set
            .get_mut(handle, true)
            .ok_or_else(|| BridgeError::invalid_state("joint has been destroyed"))?;
        let record = self
            .joints
            .get_mut(&handle)
            .ok_or_else(|| BridgeError::invalid_state("joint has no record"))?;
        Ok((joint, record))
    }

    /// 关节记录
    pub fn joint_record(&self, handle: ImpulseJointHandle) -> BridgeResult<&JointRecord> {
        if !self.impulse_joint_set.contains(handle) {
            return Err(BridgeError::invalid_state("joint has been destroyed"));
        }
        self.joints
            .get(&handle)
            .ok_or_else(|| BridgeError::invalid_state("joint has no record"))
    }

    /// 修改马达状态并同步到 Rapier；不支持马达的关节忽略
    fn update_motor(
        &mut self,
        handle: ImpulseJointHandle,
        update: impl FnOnce(&mut MotorState),
    ) -> BridgeResult<()> {
        let factor = self.motor_factor;
        let (joint, record) = self.joint_parts(handle)?;
        if !record.kind.supports_motor() {
            return Ok(());
        }
        update(&mut record.motor);
        apply_motor(&mut joint.data, record, factor);
        Ok(())
    }

    pub fn set_motor_speed(&mut self, handle: ImpulseJointHandle, speed: Real) -> BridgeResult<()> {
        self.update_motor(handle, |motor| motor.speed = speed)
    }

    pub fn enable_motor(&mut self, handle: ImpulseJointHandle, enabled: bool) -> BridgeResult<()> {
        self.update_motor(handle, |motor| motor.enabled = enabled)
    }

    /// 只对旋转关节和轮子关节生效
    pub fn set_max_motor_torque(
        &mut self,
        handle: ImpulseJointHandle,
        torque: Real,
    ) -> BridgeResult<()> {
        if !self.joint_record(handle)?.kind.has_angular_motor() {
            return Ok(());
        }
        self.update_motor(handle, |motor| motor.max_effort = torque)
    }

    pub fn motor_speed(&self, handle: ImpulseJointHandle) -> BridgeResult<Real> {
        let record = self.joint_record(handle)?;
        Ok(if record.kind.supports_motor() { record.motor.speed } else { 0.0 })
    }

    pub fn is_motor_enabled(&self, handle: ImpulseJointHandle) -> BridgeResult<bool> {
        let record = self.joint_record(handle)?;
        Ok(record.kind.supports_motor() && record.motor.enabled)
    }

    /// 移动鼠标关节目标点
    pub fn set_mouse_target(&mut self, handle: ImpulseJointHandle, target: Vec2) -> BridgeResult<()> {
        let body_a = self
            .impulse_joint_set
            .get(handle)
            .map(|joint| joint.body1)
            .ok_or_else(|| BridgeError::invalid_state("joint has been destroyed"))?;
        let anchor = self
            .rigid_body_set
            .get(body_a)
            .map(|body| body.position().inverse_transform_point(&to_point(target)))
            .ok_or_else(|| BridgeError::invalid_state("joint bodyA has been destroyed"))?;

        let (joint, record) = self.joint_parts(handle)?;
        if record.kind != JointKind::Mouse {
            return Ok(());
        }
        record.target = target;
        joint.data.set_local_anchor1(anchor);
        Ok(())
    }

    pub fn mouse_target(&self, handle: ImpulseJointHandle) -> BridgeResult<Vec2> {
        Ok(self.joint_record(handle)?.target)
    }

    pub fn set_mouse_max_force(&mut self, handle: ImpulseJointHandle, force: Real) -> BridgeResult<()> {
        let (joint, record) = self.joint_parts(handle)?;
        if record.kind != JointKind::Mouse {
            return Ok(());
        }
        record.max_force = force;
        for axis in [JointAxis::LinX, JointAxis::LinY] {
            joint.data.set_motor_max_force(axis, force);
        }
        Ok(())
    }

    pub fn mouse_max_force(&self, handle: ImpulseJointHandle) -> BridgeResult<Real> {
        Ok(self.joint_record(handle)?.max_force)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_bodies() -> (RigidBodySet, RigidBodyHandle, RigidBodyHandle) {
        let mut bodies = RigidBodySet::new();
        let a = bodies.insert(RigidBodyBuilder::fixed().build());
        let b = bodies.insert(
            RigidBodyBuilder::dynamic()
                .translation(vector![1.0, 0.0])
                .build(),
        );
        (bodies, a, b)
    }

    fn base(a: RigidBodyHandle, b: RigidBodyHandle) -> JointBase {
        JointBase { body_a: a, body_b: b, collide_connected: false }
    }

    #[test]
    fn test_type_codes() {
        assert_eq!(JointKind::Revolute.type_code(), 1);
        assert_eq!(JointKind::Prismatic.type_code(), 2);
        assert_eq!(JointKind::Distance.type_code(), 3);
        assert_eq!(JointKind::Mouse.type_code(), 5);
        assert_eq!(JointKind::Wheel.type_code(), 7);
        assert_eq!(JointKind::Weld.type_code(), 8);
        assert!(!JointKind::Distance.supports_motor());
        assert!(JointKind::Wheel.supports_motor());
        assert!(!JointKind::Prismatic.has_angular_motor());
    }

    #[test]
    fn test_revolute_joint() {
        let (bodies, a, b) = two_bodies();
        let spec = JointSpec::Revolute(
            base(a, b),
            RevoluteSpec {
                local_anchor_a: Vec2::new(0.5, 0.0),
                local_anchor_b: Vec2::new(-0.5, 0.0),
                reference_angle: 0.0,
                enable_limit: true,
                lower_angle: -0.5,
                upper_angle: 0.5,
                motor: MotorState { enabled: true, speed: 2.0, max_effort: 10.0 },
            },
        );
        let (mut joint, record) = spec.to_rapier_joint(&bodies, 1.0).unwrap();
        assert_eq!(record.kind, JointKind::Revolute);
        assert_eq!(record.motor.speed, 2.0);
        assert!(!joint.contacts_enabled);
        assert!(joint.as_revolute_mut().is_some());
        assert_eq!(joint.local_anchor1().x, 0.5);
    }

    #[test]
    fn test_distance_joint_variants() {
        let (bodies, a, b) = two_bodies();
        let rigid = DistanceSpec {
            local_anchor_a: Vec2::ZERO,
            local_anchor_b: Vec2::ZERO,
            length: 1.0,
            min_length: 1.0,
            max_length: 1.0,
            stiffness: 0.0,
            damping: 0.0,
        };
        let spring = DistanceSpec { stiffness: 5.0, damping: 0.5, ..rigid.clone() };
        assert!(JointSpec::Distance(base(a, b), rigid).to_rapier_joint(&bodies, 1.0).is_ok());
        let (_, record) = JointSpec::Distance(base(a, b), spring)
            .to_rapier_joint(&bodies, 1.0)
            .unwrap();
        assert_eq!(record.kind, JointKind::Distance);
        assert_eq!(record.motor, MotorState::default());
    }

    #[test]
    fn test_mouse_joint_anchors() {
        let (bodies, a, b) = two_bodies();
        let spec = JointSpec::Mouse(
            base(a, b),
            MouseSpec { target: Vec2::new(1.0, 0.0), max_force: 100.0, stiffness: 5.0, damping: 0.7 },
        );
        let (joint, record) = spec.to_rapier_joint(&bodies, 1.0).unwrap();
        assert_eq!(record.target, Vec2::new(1.0, 0.0));
        assert_eq!(joint.local_anchor1().x, 1.0);
        assert_eq!(joint.local_anchor2().x, 0.0);
    }

    #[test]
    fn test_wheel_joint_frees_axis_and_rotation() {
        let (bodies, a, b) = two_bodies();
        let spec = JointSpec::Wheel(
            base(a, b),
            WheelSpec {
                local_axis_a: Vec2::Y,
                stiffness: 20.0,
                damping: 0.7,
                motor: MotorState { enabled: true, speed: -3.0, max_effort: 50.0 },
                ..Default::default()
            },
        );
        let (joint, record) = spec.to_rapier_joint(&bodies, 1.0).unwrap();
        assert_eq!(record.kind, JointKind::Wheel);
        assert_eq!(record.motor.speed, -3.0);
        assert_eq!(joint.locked_axes, JointAxesMask::LIN_Y);
        assert!(joint.motor_axes.contains(JointAxesMask::LIN_X));
        assert!(joint.motor_axes.contains(JointAxesMask::ANG_X));

        let angular = joint.motor(JointAxis::AngX).unwrap();
        assert_eq!(angular.target_vel, -3.0);
        assert_eq!(angular.max_force, 50.0);
        let suspension = joint.motor(JointAxis::LinX).unwrap();
        assert_eq!(suspension.stiffness, 20.0);
    }

    #[test]
    fn test_missing_body_is_invalid_state() {
        let (mut bodies, a, b) = two_bodies();
        let mut islands = IslandManager::new();
        let mut colliders = ColliderSet::new();
        let mut impulse_joints = ImpulseJointSet::new();
        let mut multibody_joints = MultibodyJointSet::new();
        bodies.remove(b, &mut islands, &mut colliders, &mut impulse_joints, &mut multibody_joints, true);

        let spec = JointSpec::Weld(
            base(a, b),
            WeldSpec { local_anchor_a: Vec2::ZERO, local_anchor_b: Vec2::ZERO, reference_angle: 0.0 },
        );
        assert!(matches!(
            spec.to_rapier_joint(&bodies, 1.0),
            Err(BridgeError::InvalidState(_))
        ));
    }
}
