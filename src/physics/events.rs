//! 碰撞事件收集与接触过滤
//!
//! Rapier 在步进过程中通过 [`EventHandler`] 报告碰撞开始/结束，通过 [`PhysicsHooks`]
//! 询问是否处理某个接触对。两者都在管线持有可变借用时被调用，所以这里只做收集和
//! 纯数据判断，脚本回调在步进结束后由上层按顺序分发。

use std::collections::HashSet;

use crossbeam_channel::Receiver;
use rapier2d::prelude::*;

use super::contact::mix_friction;
use super::defs::FilterData;

/// 夹具默认开启的事件
pub const FIXTURE_EVENTS: ActiveEvents = ActiveEvents::COLLISION_EVENTS;

/// 夹具默认开启的钩子
pub fn fixture_hooks() -> ActiveHooks {
    ActiveHooks::FILTER_CONTACT_PAIRS
        | ActiveHooks::FILTER_INTERSECTION_PAIR
        | ActiveHooks::MODIFY_SOLVER_CONTACTS
}

// ===== 事件收集 =====

/// 一次步进期间的碰撞事件队列
pub struct StepEventQueue {
    collector: ChannelEventCollector,
    collision_events: Receiver<CollisionEvent>,
    _contact_force_events: Receiver<ContactForceEvent>,
}

impl StepEventQueue {
    pub fn new() -> Self {
        let (collision_send, collision_events) = crossbeam_channel::unbounded();
        let (contact_force_send, contact_force_events) = crossbeam_channel::unbounded();
        Self {
            collector: ChannelEventCollector::new(collision_send, contact_force_send),
            collision_events,
            _contact_force_events: contact_force_events,
        }
    }

    /// 传给 `PhysicsPipeline::step` 的事件处理器
    pub fn handler(&self) -> &ChannelEventCollector {
        &self.collector
    }

    /// 按到达顺序取出所有事件
    pub fn drain(&self) -> Vec<CollisionEvent> {
        self.collision_events.try_iter().collect()
    }
}

impl Default for StepEventQueue {
    fn default() -> Self {
        Self::new()
    }
}

// ===== 接触过滤 =====

/// 接触过滤钩子
///
/// - 按 Box2D 规则比较两个夹具的 [`FilterData`] (打包在碰撞体的 `user_data` 中)
/// - 脚本通过 `Contact.SetEnabled(false)` 关闭的接触对，在下一次求解时清空求解接触点
/// - 求解接触点的摩擦系数改为 `sqrt(f1 * f2)`，Rapier 自带的组合规则里没有这一种
#[derive(Debug, Default)]
pub struct ContactGate {
    disabled: HashSet<(ColliderHandle, ColliderHandle)>,
}

impl ContactGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置接触对是否参与求解
    pub fn set_enabled(&mut self, a: ColliderHandle, b: ColliderHandle, enabled: bool) {
        if enabled {
            self.disabled.remove(&(a, b));
            self.disabled.remove(&(b, a));
        } else {
            self.disabled.insert((a, b));
        }
    }

    pub fn is_enabled(&self, a: ColliderHandle, b: ColliderHandle) -> bool {
        !self.disabled.contains(&(a, b)) && !self.disabled.contains(&(b, a))
    }

    /// 步进结束后恢复所有接触对 (Box2D 每一步都会重置 enabled 标记)
    pub fn reset(&mut self) {
        self.disabled.clear();
    }

    /// 移除与某个碰撞体相关的记录
    pub fn forget_collider(&mut self, handle: ColliderHandle) {
        self.disabled.retain(|(a, b)| *a != handle && *b != handle);
    }

    fn mixed_friction(colliders: &ColliderSet, a: ColliderHandle, b: ColliderHandle) -> Real {
        match (colliders.get(a), colliders.get(b)) {
            (Some(ca), Some(cb)) => mix_friction(ca.friction(), cb.friction()),
            _ => 0.0,
        }
    }

    fn filters_allow(colliders: &ColliderSet, a: ColliderHandle, b: ColliderHandle) -> bool {
        match (colliders.get(a), colliders.get(b)) {
            (Some(ca), Some(cb)) => {
                FilterData::unpack(ca.user_data).should_collide(&FilterData::unpack(cb.user_data))
            }
            _ => true,
        }
    }
}

impl PhysicsHooks for ContactGate {
    fn filter_contact_pair(&self, context: &PairFilterContext) -> Option<SolverFlags> {
        if Self::filters_allow(context.colliders, context.collider1, context.collider2) {
            Some(SolverFlags::COMPUTE_IMPULSES)
        } else {
            None
        }
    }

    fn filter_intersection_pair(&self, context: &PairFilterContext) -> bool {
        Self::filters_allow(context.colliders, context.collider1, context.collider2)
    }

    fn modify_solver_contacts(&self, context: &mut ContactModificationContext) {
        if !self.is_enabled(context.collider1, context.collider2) {
            context.solver_contacts.clear();
            return;
        }

        let friction = Self::mixed_friction(context.colliders, context.collider1, context.collider2);
        for contact in context.solver_contacts.iter_mut() {
            contact.friction = friction;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_enable_is_symmetric() {
        let mut colliders = ColliderSet::new();
        let a = colliders.insert(ColliderBuilder::ball(1.0).build());
        let b = colliders.insert(ColliderBuilder::ball(1.0).build());

        let mut gate = ContactGate::new();
        assert!(gate.is_enabled(a, b));
        gate.set_enabled(a, b, false);
        assert!(!gate.is_enabled(b, a));
        gate.set_enabled(b, a, true);
        assert!(gate.is_enabled(a, b));

        gate.set_enabled(a, b, false);
        gate.reset();
        assert!(gate.is_enabled(a, b));
    }

    #[test]
    fn test_gate_forgets_removed_colliders() {
        let mut colliders = ColliderSet::new();
        let a = colliders.insert(ColliderBuilder::ball(1.0).build());
        let b = colliders.insert(ColliderBuilder::ball(1.0).build());

        let mut gate = ContactGate::new();
        gate.set_enabled(a, b, false);
        gate.forget_collider(a);
        assert!(gate.is_enabled(a, b));
    }

    #[test]
    fn test_filter_reads_user_data() {
        let mut colliders = ColliderSet::new();
        let solo = FilterData { group_index: -1, ..Default::default() };
        let a = colliders.insert(ColliderBuilder::ball(1.0).user_data(solo.pack()).build());
        let b = colliders.insert(ColliderBuilder::ball(1.0).user_data(solo.pack()).build());
        let c = colliders.insert(
            ColliderBuilder::ball(1.0)
                .user_data(FilterData::default().pack())
                .build(),
        );
        assert!(!ContactGate::filters_allow(&colliders, a, b));
        assert!(ContactGate::filters_allow(&colliders, a, c));
    }

    #[test]
    fn test_mixed_friction_uses_geometric_mean() {
        let mut colliders = ColliderSet::new();
        let ice = colliders.insert(ColliderBuilder::ball(1.0).friction(0.0).build());
        let rubber = colliders.insert(ColliderBuilder::ball(1.0).friction(0.2).build());
        let wood = colliders.insert(ColliderBuilder::ball(1.0).friction(0.8).build());

        assert_eq!(ContactGate::mixed_friction(&colliders, ice, rubber), 0.0);
        assert!((ContactGate::mixed_friction(&colliders, rubber, wood) - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_event_queue_starts_empty() {
        let queue = StepEventQueue::new();
        assert!(queue.drain().is_empty());
    }
}
