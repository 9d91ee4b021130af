//! 接触快照
//!
//! 接触数据在下一次步进时会被覆盖，交给回调的一律是拷贝。

use glam::Vec2;
use rapier2d::prelude::*;

use super::world::PhysicsState;
use super::{from_point, from_vector};

/// Box2D `b2_maxManifoldPoints`
pub const MAX_MANIFOLD_POINTS: usize = 2;

/// 局部流形 (`b2Manifold` 的子集)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LocalManifold {
    pub point_count: usize,
    pub local_normal: Vec2,
    pub local_point: Vec2,
}

/// 世界坐标流形 (`b2WorldManifold`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorldManifold {
    pub normal: Vec2,
    pub points: Vec<Vec2>,
    pub separations: Vec<Real>,
}

impl WorldManifold {
    pub fn point_count(&self) -> usize {
        self.points.len()
    }
}

/// 求解冲量 (`b2ContactImpulse`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactImpulse {
    pub normal_impulses: Vec<Real>,
    pub tangent_impulses: Vec<Real>,
}

impl ContactImpulse {
    pub fn count(&self) -> usize {
        self.normal_impulses.len()
    }
}

/// 一个接触对在某一时刻的拷贝
#[derive(Debug, Clone, PartialEq)]
pub struct ContactSnapshot {
    pub fixture_a: ColliderHandle,
    pub fixture_b: ColliderHandle,
    pub touching: bool,
    pub enabled: bool,
    pub sensor: bool,
    pub friction: Real,
    pub restitution: Real,
    pub manifold: LocalManifold,
    pub world_manifold: WorldManifold,
    pub impulse: ContactImpulse,
}

impl ContactSnapshot {
    fn empty(a: ColliderHandle, b: ColliderHandle) -> Self {
        Self {
            fixture_a: a,
            fixture_b: b,
            touching: false,
            enabled: true,
            sensor: false,
            friction: 0.0,
            restitution: 0.0,
            manifold: LocalManifold::default(),
            world_manifold: WorldManifold::default(),
            impulse: ContactImpulse::default(),
        }
    }

    /// 从当前窄相数据构造快照
    ///
    /// `touching_hint` 用于接触对已经被移除的情况 (例如结束事件时夹具已销毁)。
    pub fn capture(
        state: &PhysicsState,
        a: ColliderHandle,
        b: ColliderHandle,
        touching_hint: bool,
    ) -> Self {
        let mut snapshot = Self::empty(a, b);
        snapshot.enabled = state.contact_gate.is_enabled(a, b);

        let (collider_a, collider_b) = match (state.collider_set.get(a), state.collider_set.get(b)) {
            (Some(ca), Some(cb)) => (ca, cb),
            _ => {
                snapshot.touching = touching_hint;
                return snapshot;
            }
        };

        snapshot.friction = mix_friction(collider_a.friction(), collider_b.friction());
        snapshot.restitution = collider_a.restitution().max(collider_b.restitution());

        if collider_a.is_sensor() || collider_b.is_sensor() {
            snapshot.sensor = true;
            snapshot.touching = state
                .narrow_phase
                .intersection_pair(a, b)
                .unwrap_or(touching_hint);
            return snapshot;
        }

        let Some(pair) = state.narrow_phase.contact_pair(a, b) else {
            snapshot.touching = touching_hint;
            return snapshot;
        };
        snapshot.touching = pair.has_any_active_contact;

        // 流形里的局部数据以 pair.collider1 为参考，必要时交换
        let flipped = pair.collider1 != a;
        let (pos1, pos2) = (
            state.collider_set[pair.collider1].position(),
            state.collider_set[pair.collider2].position(),
        );

        let Some(manifold) = pair.manifolds.iter().find(|m| !m.points.is_empty()) else {
            return snapshot;
        };

        if let Some(solver) = manifold.data.solver_contacts.first() {
            snapshot.friction = solver.friction;
            snapshot.restitution = solver.restitution;
        }

        let points: Vec<_> = manifold.points.iter().take(MAX_MANIFOLD_POINTS).collect();
        let sign = if flipped { -1.0 } else { 1.0 };
        let (local_normal, local_point) = if flipped {
            (manifold.local_n2, points[0].local_p2)
        } else {
            (manifold.local_n1, points[0].local_p1)
        };

        snapshot.manifold = LocalManifold {
            point_count: points.len(),
            local_normal: from_vector(&local_normal),
            local_point: from_point(&local_point),
        };

        snapshot.world_manifold = WorldManifold {
            normal: from_vector(&manifold.data.normal) * sign,
            points: points
                .iter()
                .map(|p| {
                    let world1 = *pos1 * p.local_p1;
                    let world2 = *pos2 * p.local_p2;
                    from_vector(&((world1.coords + world2.coords) * 0.5))
                })
                .collect(),
            separations: points.iter().map(|p| p.dist).collect(),
        };

        snapshot.impulse = ContactImpulse {
            normal_impulses: points.iter().map(|p| p.data.impulse).collect(),
            tangent_impulses: points.iter().map(|p| p.data.tangent_impulse[0]).collect(),
        };

        snapshot
    }
}

/// Box2D `b2MixFriction`
pub fn mix_friction(a: Real, b: Real) -> Real {
    (a * b).sqrt()
}

/// 接触监听接口 (`b2ContactListener`)
///
/// 由 [`PhysicsState`] 的分发函数在步进结束后按顺序调用；实现方可以重入世界的只读接口。
pub trait ContactListener {
    type Error;

    /// 是否关心某类事件；返回 `false` 时不会构造快照
    fn wants(&self, event: ContactEventKind) -> bool;

    fn begin_contact(&mut self, contact: ContactSnapshot) -> Result<(), Self::Error>;
    fn end_contact(&mut self, contact: ContactSnapshot) -> Result<(), Self::Error>;
    fn pre_solve(&mut self, contact: ContactSnapshot) -> Result<(), Self::Error>;
    fn post_solve(
        &mut self,
        contact: ContactSnapshot,
        impulse: ContactImpulse,
    ) -> Result<(), Self::Error>;
}

/// 接触事件种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactEventKind {
    Begin,
    End,
    PreSolve,
    PostSolve,
}

impl ContactEventKind {
    pub fn callback_name(&self) -> &'static str {
        match self {
            ContactEventKind::Begin => "BeginContact",
            ContactEventKind::End => "EndContact",
            ContactEventKind::PreSolve => "PreSolve",
            ContactEventKind::PostSolve => "PostSolve",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mix_friction() {
        assert_eq!(mix_friction(0.0, 1.0), 0.0);
        assert!((mix_friction(0.25, 1.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_impulse_count() {
        let impulse = ContactImpulse {
            normal_impulses: vec![1.0, 2.0],
            tangent_impulses: vec![0.0, 0.0],
        };
        assert_eq!(impulse.count(), 2);
        assert_eq!(WorldManifold::default().point_count(), 0);
    }

    #[test]
    fn test_callback_names() {
        assert_eq!(ContactEventKind::Begin.callback_name(), "BeginContact");
        assert_eq!(ContactEventKind::PostSolve.callback_name(), "PostSolve");
    }
}
