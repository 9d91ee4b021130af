//! `b2World` 包装
//!
//! 世界拥有引擎状态和监听器。步进时先在短借用里推进管线，再释放借用、加锁，
//! 按顺序把接触事件交给脚本；锁定期间结构性修改抛 `InvalidState`。

use rquickjs::class::Trace;
use rquickjs::function::Opt;
use rquickjs::{Class, Ctx, FromJs, Object, Result, Value};

use super::body::{body_from_value, Body};
use super::carriers::{StateRef, WorldCell};
use super::defs::BodyDef;
use super::joint::{joint_from_value, wrap_joint};
use super::joint_defs::joint_spec_from_value;
use super::listener::{ListenerSlot, ScriptContactListener};
use super::query::{ScriptQuery, ScriptRayCast};
use super::vec2::{count, number, type_error, vec2_from_value, vec2_to_value};
use crate::config::SimulationConfig;
use crate::core::OrThrow;
use crate::physics::{
    dispatch_contact_events, dispatch_end_contacts, run_query, run_ray_cast, ContactEventKind,
    ContactListener, PhysicsState, WorldLock,
};

/// Box2D 示例里常用的迭代次数
const DEFAULT_VELOCITY_ITERATIONS: usize = 8;
const DEFAULT_POSITION_ITERATIONS: usize = 3;

/// `b2World`
#[derive(Trace)]
#[rquickjs::class(rename = "b2World")]
pub struct World<'js> {
    state: WorldCell,
    listener: ListenerSlot<'js>,
}

impl<'js> World<'js> {
    /// `b2World(gravity)`
    pub fn construct(ctx: &Ctx<'js>, gravity: &Value<'js>, config: &SimulationConfig) -> Result<Self> {
        let gravity = vec2_from_value(ctx, gravity, "gravity")?;
        tracing::debug!(target: "scripting", ?gravity, "world created");
        Ok(Self {
            state: WorldCell::new(PhysicsState::new(gravity, config)),
            listener: ListenerSlot::default(),
        })
    }

    fn world_ref(&self) -> StateRef {
        StateRef::new(self.state.shared())
    }

    fn listener_adapter(&self, ctx: &Ctx<'js>) -> ScriptContactListener<'_, 'js> {
        ScriptContactListener::new(ctx.clone(), &self.listener, self.world_ref())
    }
}

#[rquickjs::methods]
impl<'js> World<'js> {
    // ===== 刚体 =====

    #[qjs(rename = "CreateBody")]
    pub fn create_body(&self, ctx: Ctx<'js>, def: Value<'js>) -> Result<Value<'js>> {
        let Ok(def) = Class::<BodyDef>::from_js(&ctx, def) else {
            return type_error(&ctx, "CreateBody expects a b2BodyDef");
        };
        let data = def.borrow().data();
        let handle = self
            .state
            .write()
            .and_then(|mut state| state.create_body(&data))
            .or_throw(&ctx)?;
        Body::wrap(&ctx, &self.world_ref(), handle)
    }

    /// 销毁前把刚体现有的接触作为 EndContact 交给监听器
    #[qjs(rename = "DestroyBody")]
    pub fn destroy_body(&self, ctx: Ctx<'js>, body: Value<'js>) -> Result<()> {
        let body = body_from_value(&ctx, &body, "body")?;
        let shared = self.state.shared();
        let handle = body.ensure_in(shared).or_throw(&ctx)?;

        let contacts = self
            .state
            .read()
            .and_then(|state| {
                state.ensure_unlocked()?;
                let fixtures = state.body_fixtures(handle)?;
                Ok(state.touching_contacts(&fixtures))
            })
            .or_throw(&ctx)?;

        let mut adapter = self.listener_adapter(&ctx);
        if !contacts.is_empty() && adapter.wants(ContactEventKind::End) {
            let _lock = WorldLock::acquire(shared).or_throw(&ctx)?;
            dispatch_end_contacts(contacts, &mut adapter)?;
        }

        self.state
            .write()
            .and_then(|mut state| state.destroy_body(handle))
            .or_throw(&ctx)
    }

    // ===== 关节 =====

    #[qjs(rename = "CreateJoint")]
    pub fn create_joint(&self, ctx: Ctx<'js>, def: Value<'js>) -> Result<Value<'js>> {
        let spec = joint_spec_from_value(&ctx, self.state.shared(), &def)?;
        let kind = spec.kind();
        let handle = self
            .state
            .write()
            .and_then(|mut state| state.create_joint(&spec))
            .or_throw(&ctx)?;
        wrap_joint(&ctx, &self.world_ref(), handle, kind)
    }

    #[qjs(rename = "DestroyJoint")]
    pub fn destroy_joint(&self, ctx: Ctx<'js>, joint: Value<'js>) -> Result<()> {
        let joint = joint_from_value(&ctx, &joint, "joint")?;
        let handle = joint.ensure_in(self.state.shared()).or_throw(&ctx)?;
        self.state
            .write()
            .and_then(|mut state| state.destroy_joint(handle))
            .or_throw(&ctx)
    }

    // ===== 步进 =====

    /// `Step(timeStep, velocityIterations, positionIterations)`
    #[qjs(rename = "Step")]
    pub fn step(
        &self,
        ctx: Ctx<'js>,
        time_step: Value<'js>,
        velocity_iterations: Opt<Value<'js>>,
        position_iterations: Opt<Value<'js>>,
    ) -> Result<()> {
        let dt = number(&ctx, &time_step, "timeStep")?;
        let velocity_iterations =
            count(&ctx, velocity_iterations.0, "velocityIterations", DEFAULT_VELOCITY_ITERATIONS)?;
        let position_iterations =
            count(&ctx, position_iterations.0, "positionIterations", DEFAULT_POSITION_ITERATIONS)?;

        let report = self
            .state
            .write()
            .and_then(|mut state| state.step(dt, velocity_iterations, position_iterations))
            .or_throw(&ctx)?;
        tracing::trace!(
            target: "scripting",
            collision_events = report.collision_events.len(),
            solver_pairs = report.solver_pairs.len(),
            "step"
        );

        if self.listener.current().is_none() {
            return Ok(());
        }
        let shared = self.state.shared();
        let _lock = WorldLock::acquire(shared).or_throw(&ctx)?;
        let mut adapter = self.listener_adapter(&ctx);
        dispatch_contact_events(shared, &report, &mut adapter)
    }

    /// 不是 `JSContactListener` 时什么也不做
    #[qjs(rename = "SetContactListener")]
    pub fn set_contact_listener(&self, ctx: Ctx<'js>, listener: Value<'js>) {
        if self.listener.install(&ctx, &listener) {
            tracing::debug!(target: "scripting", "contact listener installed");
        } else {
            tracing::warn!(target: "scripting", "SetContactListener ignored a non-listener value");
        }
    }

    // ===== 查询 =====

    #[qjs(rename = "RayCast")]
    pub fn ray_cast(
        &self,
        ctx: Ctx<'js>,
        callback: Value<'js>,
        point1: Value<'js>,
        point2: Value<'js>,
    ) -> Result<()> {
        let mut adapter = ScriptRayCast::new(&ctx, &callback, self.world_ref())?;
        let p1 = vec2_from_value(&ctx, &point1, "point1")?;
        let p2 = vec2_from_value(&ctx, &point2, "point2")?;
        let hits = self
            .state
            .write()
            .map(|mut state| state.ray_candidates(p1, p2))
            .or_throw(&ctx)?;
        run_ray_cast(hits, &mut adapter)
    }

    /// `QueryAABB(callback, lower, upper)`，也接受 `QueryAABB(callback, {lowerBound, upperBound})`
    #[qjs(rename = "QueryAABB")]
    pub fn query_aabb(
        &self,
        ctx: Ctx<'js>,
        callback: Value<'js>,
        lower: Value<'js>,
        upper: Opt<Value<'js>>,
    ) -> Result<()> {
        let mut adapter = ScriptQuery::new(&ctx, &callback, self.world_ref())?;
        let (lower, upper) = match upper.0 {
            Some(upper) if !upper.is_undefined() => (
                vec2_from_value(&ctx, &lower, "lower")?,
                vec2_from_value(&ctx, &upper, "upper")?,
            ),
            _ => {
                let Some(aabb) = lower.as_object() else {
                    return type_error(&ctx, "QueryAABB expects lower and upper bounds");
                };
                (
                    vec2_from_value(&ctx, &aabb.get("lowerBound")?, "lowerBound")?,
                    vec2_from_value(&ctx, &aabb.get("upperBound")?, "upperBound")?,
                )
            }
        };
        let fixtures = self
            .state
            .write()
            .map(|mut state| state.aabb_candidates(lower, upper))
            .or_throw(&ctx)?;
        run_query(fixtures, &mut adapter)
    }

    // ===== 世界属性 =====

    #[qjs(rename = "GetGravity")]
    pub fn get_gravity(&self, ctx: Ctx<'js>) -> Result<Object<'js>> {
        let gravity = self.state.read().map(|state| state.gravity()).or_throw(&ctx)?;
        vec2_to_value(&ctx, gravity)
    }

    #[qjs(rename = "SetGravity")]
    pub fn set_gravity(&self, ctx: Ctx<'js>, gravity: Value<'js>) -> Result<()> {
        let gravity = vec2_from_value(&ctx, &gravity, "gravity")?;
        self.state
            .write()
            .map(|mut state| state.set_gravity(gravity))
            .or_throw(&ctx)
    }

    #[qjs(rename = "GetBodyCount")]
    pub fn get_body_count(&self, ctx: Ctx<'js>) -> Result<usize> {
        self.state.read().map(|state| state.body_count()).or_throw(&ctx)
    }

    #[qjs(rename = "GetJointCount")]
    pub fn get_joint_count(&self, ctx: Ctx<'js>) -> Result<usize> {
        self.state.read().map(|state| state.joint_count()).or_throw(&ctx)
    }

    #[qjs(rename = "IsLocked")]
    pub fn is_locked(&self, ctx: Ctx<'js>) -> Result<bool> {
        self.state.read().map(|state| state.is_locked()).or_throw(&ctx)
    }
}
