//! 物理层
//!
//! 以 Box2D 的语义包装 Rapier 2D：
//!
//! - `world` - [`PhysicsState`]，持有 Rapier 的全部集合与管线，负责创建/销毁实体和步进
//! - `defs` - 刚体/夹具定义 (对应 `b2BodyDef` / `b2FixtureDef`)
//! - `shapes` - 形状定义 (多边形、圆、线段)
//! - `joints` - 关节规格、关节记录和马达分发
//! - `events` - 碰撞事件收集和接触过滤钩子
//! - `contact` - 接触快照 (流形、冲量的拷贝)
//! - `query` - 射线/AABB 查询以及回调接口
//!
//! 这一层不依赖脚本运行时，回调接口以 trait 的形式暴露给上层实现。

pub mod contact;
pub mod defs;
pub mod events;
pub mod joints;
pub mod query;
pub mod shapes;
pub mod world;

#[cfg(test)]
mod tests;

use glam::Vec2;
use rapier2d::prelude::*;

pub use contact::{
    ContactEventKind, ContactImpulse, ContactListener, ContactSnapshot, LocalManifold, WorldManifold,
};
pub use defs::{BodyDefData, FilterData, FilterUpdate, FixtureDefData};
pub use joints::{
    DistanceSpec, JointBase, JointKind, JointRecord, JointSpec, MotorState, MouseSpec, PrismaticSpec,
    RevoluteSpec, WeldSpec, WheelSpec,
};
pub use query::{run_query, run_ray_cast, QueryCallback, RayCastCallback, RayHit};
pub use shapes::{ShapeCell, ShapeDef};
pub use world::{
    dispatch_contact_events, dispatch_end_contacts, PhysicsState, SolverPair, StepReport, WorldLock,
    MAX_SOLVER_ITERATIONS,
};

// ===== 向量转换 =====

/// glam 向量转换为 Rapier 向量
#[inline]
pub fn to_vector(v: Vec2) -> Vector<Real> {
    vector![v.x, v.y]
}

/// glam 向量转换为 Rapier 点
#[inline]
pub fn to_point(v: Vec2) -> Point<Real> {
    point![v.x, v.y]
}

/// Rapier 向量转换为 glam 向量
#[inline]
pub fn from_vector(v: &Vector<Real>) -> Vec2 {
    Vec2::new(v.x, v.y)
}

/// Rapier 点转换为 glam 向量
#[inline]
pub fn from_point(p: &Point<Real>) -> Vec2 {
    Vec2::new(p.x, p.y)
}

// ===== 刚体类型 =====

/// Box2D `b2BodyType` 数值：static = 0, kinematic = 1, dynamic = 2
pub fn body_type_from_code(code: i32) -> Option<RigidBodyType> {
    match code {
        0 => Some(RigidBodyType::Fixed),
        1 => Some(RigidBodyType::KinematicVelocityBased),
        2 => Some(RigidBodyType::Dynamic),
        _ => None,
    }
}

/// 刚体类型对应的 Box2D 数值
pub fn body_type_code(body_type: RigidBodyType) -> i32 {
    match body_type {
        RigidBodyType::Fixed => 0,
        RigidBodyType::KinematicVelocityBased | RigidBodyType::KinematicPositionBased => 1,
        RigidBodyType::Dynamic => 2,
    }
}

// ===== 实体句柄 =====

/// 实体种类，用于错误信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Body,
    Fixture,
    Joint,
}

impl EntityKind {
    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Body => "body",
            EntityKind::Fixture => "fixture",
            EntityKind::Joint => "joint",
        }
    }
}

/// Rapier 句柄到实体的查找
///
/// Rapier 的句柄带有代数 (generation)，实体被移除后旧句柄不会命中新实体。
pub trait EngineHandle: Copy + std::fmt::Debug + 'static {
    type Target;
    const KIND: EntityKind;

    fn lookup(state: &PhysicsState, handle: Self) -> Option<&Self::Target>;
    fn lookup_mut(state: &mut PhysicsState, handle: Self) -> Option<&mut Self::Target>;
}

impl EngineHandle for RigidBodyHandle {
    type Target = RigidBody;
    const KIND: EntityKind = EntityKind::Body;

    fn lookup(state: &PhysicsState, handle: Self) -> Option<&RigidBody> {
        state.rigid_body_set.get(handle)
    }

    fn lookup_mut(state: &mut PhysicsState, handle: Self) -> Option<&mut RigidBody> {
        state.rigid_body_set.get_mut(handle)
    }
}

impl EngineHandle for ColliderHandle {
    type Target = Collider;
    const KIND: EntityKind = EntityKind::Fixture;

    fn lookup(state: &PhysicsState, handle: Self) -> Option<&Collider> {
        state.collider_set.get(handle)
    }

    fn lookup_mut(state: &mut PhysicsState, handle: Self) -> Option<&mut Collider> {
        state.collider_set.get_mut(handle)
    }
}

impl EngineHandle for ImpulseJointHandle {
    type Target = ImpulseJoint;
    const KIND: EntityKind = EntityKind::Joint;

    fn lookup(state: &PhysicsState, handle: Self) -> Option<&ImpulseJoint> {
        state.impulse_joint_set.get(handle)
    }

    fn lookup_mut(state: &mut PhysicsState, handle: Self) -> Option<&mut ImpulseJoint> {
        state.impulse_joint_set.get_mut(handle, true)
    }
}
