use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::rc::Rc;

use glam::Vec2;
use rapier2d::prelude::*;

use super::contact::{ContactEventKind, ContactListener, ContactSnapshot};
use super::defs::{BodyDefData, FixtureDefData};
use super::events::{fixture_hooks, ContactGate, StepEventQueue, FIXTURE_EVENTS};
use super::joints::{JointRecord, JointSpec};
use super::{from_vector, to_vector};
use crate::config::SimulationConfig;
use crate::core::{BridgeError, BridgeResult};

/// 每步速度迭代次数上限
pub const MAX_SOLVER_ITERATIONS: usize = 256;

/// 物理世界状态
///
/// 持有 Rapier 的所有集合和管线，以及绑定层自己的关节记录、接触开关和锁标记。
pub struct PhysicsState {
    pub gravity: Vector<Real>,
    pub integration_parameters: IntegrationParameters,
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub query_pipeline: QueryPipeline,
    pub(crate) joints: HashMap<ImpulseJointHandle, JointRecord>,
    pub(crate) contact_gate: ContactGate,
    pub(crate) motor_factor: Real,
    events: StepEventQueue,
    /// 销毁夹具时仍在接触的接触对，下一次步进时作为 EndContact 交出
    ended_contacts: Vec<ContactSnapshot>,
    unit_mass_fallback: bool,
    locked: Cell<bool>,
}

/// 参与求解的接触对
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverPair {
    pub fixture_a: ColliderHandle,
    pub fixture_b: ColliderHandle,
    /// 本次步进是否产生了求解接触点
    pub solved: bool,
}

/// 一次步进的结果，供接触分发使用
#[derive(Debug, Clone, Default)]
pub struct StepReport {
    /// 上一步之后被单独销毁的夹具留下的接触，先于本步事件分发
    pub ended_contacts: Vec<ContactSnapshot>,
    pub collision_events: Vec<CollisionEvent>,
    pub solver_pairs: Vec<SolverPair>,
}

impl PhysicsState {
    pub fn new(gravity: Vec2, config: &SimulationConfig) -> Self {
        Self {
            gravity: to_vector(gravity),
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            query_pipeline: QueryPipeline::new(),
            joints: HashMap::new(),
            contact_gate: ContactGate::new(),
            motor_factor: config.motor_damping_factor,
            events: StepEventQueue::new(),
            ended_contacts: Vec::new(),
            unit_mass_fallback: config.unit_mass_fallback,
            locked: Cell::new(false),
        }
    }

    /// 包装为共享状态
    pub fn into_shared(self) -> Rc<RefCell<PhysicsState>> {
        Rc::new(RefCell::new(self))
    }

    pub fn gravity(&self) -> Vec2 {
        from_vector(&self.gravity)
    }

    pub fn set_gravity(&mut self, gravity: Vec2) {
        self.gravity = to_vector(gravity);
    }

    pub fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }

    pub fn joint_count(&self) -> usize {
        self.impulse_joint_set.len()
    }

    // ===== 锁 =====

    pub fn is_locked(&self) -> bool {
        self.locked.get()
    }

    pub(crate) fn ensure_unlocked(&self) -> BridgeResult<()> {
        if self.locked.get() {
            Err(BridgeError::WorldLocked)
        } else {
            Ok(())
        }
    }

    // ===== 刚体 =====

    /// 按定义创建刚体
    pub fn create_body(&mut self, def: &BodyDefData) -> BridgeResult<RigidBodyHandle> {
        self.ensure_unlocked()?;
        let handle = self.rigid_body_set.insert(def.to_rigid_body());
        self.refresh_mass(handle);
        tracing::debug!(target: "physics", ?handle, body_type = def.body_type, "body created");
        Ok(handle)
    }

    /// 销毁刚体以及它的夹具和关节
    pub fn destroy_body(&mut self, handle: RigidBodyHandle) -> BridgeResult<()> {
        self.ensure_unlocked()?;
        let colliders = self
            .rigid_body_set
            .get(handle)
            .map(|body| body.colliders().to_vec())
            .ok_or_else(|| BridgeError::invalid_state("body has been destroyed"))?;
        for collider in colliders {
            self.contact_gate.forget_collider(collider);
        }

        self.rigid_body_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
        let joint_set = &self.impulse_joint_set;
        self.joints.retain(|joint, _| joint_set.contains(*joint));
        tracing::debug!(target: "physics", ?handle, "body destroyed");
        Ok(())
    }

    /// 修改刚体类型后需要重新计算质量
    pub fn set_body_type(&mut self, handle: RigidBodyHandle, code: i32) -> BridgeResult<()> {
        let body_type = super::body_type_from_code(code)
            .ok_or_else(|| BridgeError::type_mismatch(format!("invalid body type {}", code)))?;
        let body = self
            .rigid_body_set
            .get_mut(handle)
            .ok_or_else(|| BridgeError::invalid_state("body has been destroyed"))?;
        body.set_body_type(body_type, true);
        self.refresh_mass(handle);
        Ok(())
    }

    /// Box2D 规则：质量为零的动态刚体使用单位质量
    pub(crate) fn refresh_mass(&mut self, handle: RigidBodyHandle) {
        let colliders = &self.collider_set;
        let Some(body) = self.rigid_body_set.get_mut(handle) else {
            return;
        };
        if self.unit_mass_fallback {
            let total: Real = body
                .colliders()
                .iter()
                .filter_map(|collider| colliders.get(*collider))
                .map(|collider| collider.mass())
                .sum();
            // 附加质量是叠加的，零值等于清除
            let extra = if body.is_dynamic() && total <= 0.0 { 1.0 } else { 0.0 };
            body.set_additional_mass_properties(
                MassProperties::new(point![0.0, 0.0], extra, 0.0),
                false,
            );
        }
        body.recompute_mass_properties_from_colliders(colliders);
    }

    // ===== 夹具 =====

    /// 按定义为刚体创建夹具
    pub fn create_fixture(
        &mut self,
        body: RigidBodyHandle,
        def: &FixtureDefData,
    ) -> BridgeResult<ColliderHandle> {
        self.ensure_unlocked()?;
        let shape = def
            .shape
            .as_ref()
            .ok_or_else(|| BridgeError::type_mismatch("FixtureDef.shape must be set"))?;
        let (shape, local) = shape.borrow().to_collider_shape()?;
        if !self.rigid_body_set.contains(body) {
            return Err(BridgeError::invalid_state("body has been destroyed"));
        }

        let collider = ColliderBuilder::new(shape)
            .position(local)
            .density(def.density)
            .friction(def.friction)
            .restitution(def.restitution)
            .restitution_combine_rule(CoefficientCombineRule::Max)
            .sensor(def.is_sensor)
            .user_data(def.filter.pack())
            .active_events(FIXTURE_EVENTS)
            .active_hooks(fixture_hooks())
            .build();
        let handle = self
            .collider_set
            .insert_with_parent(collider, body, &mut self.rigid_body_set);
        self.refresh_mass(body);
        tracing::debug!(target: "physics", ?body, fixture = ?handle, "fixture created");
        Ok(handle)
    }

    /// 销毁夹具
    ///
    /// 销毁前的接触快照留到下一次步进的报告里，由世界的监听器收到 EndContact。
    pub fn destroy_fixture(&mut self, handle: ColliderHandle) -> BridgeResult<()> {
        self.ensure_unlocked()?;
        let parent = self
            .collider_set
            .get(handle)
            .ok_or_else(|| BridgeError::invalid_state("fixture has been destroyed"))?
            .parent();
        let ended = self.touching_contacts(&[handle]);
        self.ended_contacts.extend(ended);
        self.contact_gate.forget_collider(handle);
        self.collider_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.rigid_body_set,
            true,
        );
        if let Some(parent) = parent {
            self.refresh_mass(parent);
        }
        Ok(())
    }

    /// 修改夹具密度并刷新刚体质量
    pub fn set_fixture_density(&mut self, handle: ColliderHandle, density: Real) -> BridgeResult<()> {
        let collider = self
            .collider_set
            .get_mut(handle)
            .ok_or_else(|| BridgeError::invalid_state("fixture has been destroyed"))?;
        collider.set_density(density);
        if let Some(parent) = collider.parent() {
            self.refresh_mass(parent);
        }
        Ok(())
    }

    /// 设置接触对是否参与下一次求解
    pub fn set_contact_enabled(&mut self, a: ColliderHandle, b: ColliderHandle, enabled: bool) {
        self.contact_gate.set_enabled(a, b, enabled);
    }

    // ===== 关节 =====

    pub fn create_joint(&mut self, spec: &JointSpec) -> BridgeResult<ImpulseJointHandle> {
        self.ensure_unlocked()?;
        let (joint, record) = spec.to_rapier_joint(&self.rigid_body_set, self.motor_factor)?;
        let base = spec.base();
        let handle = self
            .impulse_joint_set
            .insert(base.body_a, base.body_b, joint, true);
        tracing::debug!(target: "physics", ?handle, kind = ?record.kind, "joint created");
        self.joints.insert(handle, record);
        Ok(handle)
    }

    pub fn destroy_joint(&mut self, handle: ImpulseJointHandle) -> BridgeResult<()> {
        self.ensure_unlocked()?;
        self.impulse_joint_set
            .remove(handle, true)
            .ok_or_else(|| BridgeError::invalid_state("joint has been destroyed"))?;
        self.joints.remove(&handle);
        tracing::debug!(target: "physics", ?handle, "joint destroyed");
        Ok(())
    }

    // ===== 步进 =====

    /// 推进一步
    ///
    /// `position_iterations` 没有对应的 Rapier 参数，只是为了保持 Box2D 的签名。
    /// 速度迭代次数限制在 `1..=MAX_SOLVER_ITERATIONS`。
    pub fn step(
        &mut self,
        dt: Real,
        velocity_iterations: usize,
        _position_iterations: usize,
    ) -> BridgeResult<StepReport> {
        self.ensure_unlocked()?;
        self.integration_parameters.dt = dt;
        self.integration_parameters.num_solver_iterations =
            NonZeroUsize::new(velocity_iterations.min(MAX_SOLVER_ITERATIONS))
                .unwrap_or(NonZeroUsize::MIN);

        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &self.contact_gate,
            self.events.handler(),
        );

        // Box2D 在每一步结束时清除外力，并重置接触的 enabled 标记
        for (_, body) in self.rigid_body_set.iter_mut() {
            body.reset_forces(false);
            body.reset_torques(false);
        }
        self.contact_gate.reset();

        let report = StepReport {
            ended_contacts: std::mem::take(&mut self.ended_contacts),
            collision_events: self.events.drain(),
            solver_pairs: self.solver_pairs(),
        };
        tracing::trace!(
            target: "physics",
            dt,
            ended = report.ended_contacts.len(),
            events = report.collision_events.len(),
            pairs = report.solver_pairs.len(),
            "world stepped"
        );
        Ok(report)
    }

    /// 当前接触中、至少一侧刚体醒着的接触对
    fn solver_pairs(&self) -> Vec<SolverPair> {
        let awake = |collider: ColliderHandle| {
            self.collider_set
                .get(collider)
                .and_then(|c| c.parent())
                .and_then(|parent| self.rigid_body_set.get(parent))
                .map(|body| !body.is_fixed() && !body.is_sleeping())
                .unwrap_or(false)
        };

        self.narrow_phase
            .contact_pairs()
            .filter(|pair| pair.has_any_active_contact)
            .filter(|pair| awake(pair.collider1) || awake(pair.collider2))
            .map(|pair| SolverPair {
                fixture_a: pair.collider1,
                fixture_b: pair.collider2,
                solved: pair
                    .manifolds
                    .iter()
                    .any(|manifold| !manifold.data.solver_contacts.is_empty()),
            })
            .collect()
    }

    /// 某些夹具当前所有接触中的接触对快照，用于销毁前补发 EndContact
    pub fn touching_contacts(&self, fixtures: &[ColliderHandle]) -> Vec<ContactSnapshot> {
        let mut pairs: Vec<(ColliderHandle, ColliderHandle)> = Vec::new();
        for fixture in fixtures {
            for pair in self.narrow_phase.contact_pairs_with(*fixture) {
                if pair.has_any_active_contact {
                    pairs.push((pair.collider1, pair.collider2));
                }
            }
            for (a, b, intersecting) in self.narrow_phase.intersection_pairs_with(*fixture) {
                if intersecting {
                    pairs.push((a, b));
                }
            }
        }
        let mut seen = Vec::with_capacity(pairs.len());
        for pair in pairs {
            if !seen.contains(&pair) && !seen.contains(&(pair.1, pair.0)) {
                seen.push(pair);
            }
        }
        seen.into_iter()
            .map(|(a, b)| ContactSnapshot::capture(self, a, b, true))
            .collect()
    }

    /// 刚体上的所有夹具
    pub fn body_fixtures(&self, body: RigidBodyHandle) -> BridgeResult<Vec<ColliderHandle>> {
        self.rigid_body_set
            .get(body)
            .map(|b| b.colliders().to_vec())
            .ok_or_else(|| BridgeError::invalid_state("body has been destroyed"))
    }
}

// ===== 世界锁 =====

/// 接触回调期间持有的锁，析构时解锁
pub struct WorldLock {
    state: Rc<RefCell<PhysicsState>>,
}

impl WorldLock {
    pub fn acquire(state: &Rc<RefCell<PhysicsState>>) -> BridgeResult<Self> {
        let guard = state
            .try_borrow()
            .map_err(|_| BridgeError::invalid_state("world is busy"))?;
        guard.ensure_unlocked()?;
        guard.locked.set(true);
        drop(guard);
        Ok(Self { state: state.clone() })
    }
}

impl Drop for WorldLock {
    fn drop(&mut self) {
        if let Ok(state) = self.state.try_borrow() {
            state.locked.set(false);
        }
    }
}

// ===== 接触分发 =====

/// 按 Begin/End → PreSolve → PostSolve 的顺序把一次步进的接触事件交给监听器
///
/// 报告里销毁夹具遗留的接触最先作为 EndContact 交出。
///
/// 每个快照只在构造时短暂借用状态，回调期间不持有任何借用。
pub fn dispatch_contact_events<L: ContactListener>(
    state: &RefCell<PhysicsState>,
    report: &StepReport,
    listener: &mut L,
) -> Result<(), L::Error> {
    dispatch_end_contacts(report.ended_contacts.iter().cloned(), listener)?;

    for event in &report.collision_events {
        // 被移除夹具的结束事件已在销毁时记录或补发
        if event.removed() {
            continue;
        }
        let kind = if event.started() {
            ContactEventKind::Begin
        } else {
            ContactEventKind::End
        };
        if !listener.wants(kind) {
            continue;
        }
        let snapshot = ContactSnapshot::capture(
            &state.borrow(),
            event.collider1(),
            event.collider2(),
            event.started(),
        );
        match kind {
            ContactEventKind::Begin => listener.begin_contact(snapshot)?,
            _ => listener.end_contact(snapshot)?,
        }
    }

    // 接触对来自刚结束的求解，这里 SetEnabled(false) 只影响下一次步进
    for pair in &report.solver_pairs {
        if !listener.wants(ContactEventKind::PreSolve) {
            break;
        }
        let snapshot = ContactSnapshot::capture(&state.borrow(), pair.fixture_a, pair.fixture_b, true);
        listener.pre_solve(snapshot)?;
    }

    for pair in report.solver_pairs.iter().filter(|pair| pair.solved) {
        if !listener.wants(ContactEventKind::PostSolve) {
            break;
        }
        let snapshot = ContactSnapshot::capture(&state.borrow(), pair.fixture_a, pair.fixture_b, true);
        let impulse = snapshot.impulse.clone();
        listener.post_solve(snapshot, impulse)?;
    }
    Ok(())
}

/// 销毁实体前补发 EndContact
pub fn dispatch_end_contacts<L: ContactListener>(
    contacts: impl IntoIterator<Item = ContactSnapshot>,
    listener: &mut L,
) -> Result<(), L::Error> {
    for contact in contacts {
        if !listener.wants(ContactEventKind::End) {
            break;
        }
        listener.end_contact(contact)?;
    }
    Ok(())
}
