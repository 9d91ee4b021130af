//! `b2Body` 包装
//!
//! 包装只持有句柄，每次调用都重新解析；刚体被销毁后调用任何方法都抛 `InvalidState`。

use glam::Vec2;
use rapier2d::prelude::*;
use rquickjs::class::Trace;
use rquickjs::function::Opt;
use rquickjs::{Array, Class, Ctx, FromJs, IntoJs, Object, Result, Value};

use super::carriers::{EntityRef, StateRef};
use super::defs::{user_data_tag, FixtureDef};
use super::fixture::{fixture_from_value, Fixture};
use super::shapes::shape_from_value;
use super::vec2::{boolean, number, optional_number, type_error, vec2_from_value, vec2_to_value, wake_flag};
use crate::core::{BridgeError, OrThrow};
use crate::physics::{body_type_code, body_type_from_code, from_point, from_vector, to_point, to_vector, FixtureDefData};

/// `b2Body`
#[derive(Trace)]
#[rquickjs::class(rename = "b2Body")]
pub struct Body {
    entity: EntityRef<RigidBodyHandle>,
}

impl Body {
    /// 为刚体句柄生成新的宿主对象
    pub fn wrap<'js>(ctx: &Ctx<'js>, world: &StateRef, handle: RigidBodyHandle) -> Result<Value<'js>> {
        Self::from_entity(ctx, EntityRef::from_world(world, handle))
    }

    pub fn from_entity<'js>(ctx: &Ctx<'js>, entity: EntityRef<RigidBodyHandle>) -> Result<Value<'js>> {
        Class::instance(ctx.clone(), Body { entity })?.into_js(ctx)
    }

    pub fn entity(&self) -> &EntityRef<RigidBodyHandle> {
        &self.entity
    }

    fn read<'js, R>(&self, ctx: &Ctx<'js>, f: impl FnOnce(&RigidBody) -> R) -> Result<R> {
        self.entity.read(f).or_throw(ctx)
    }

    fn write<'js, R>(&self, ctx: &Ctx<'js>, f: impl FnOnce(&mut RigidBody) -> R) -> Result<R> {
        self.entity.write(f).or_throw(ctx)
    }

    /// 力和冲量只作用于动态刚体；`wake = false` 时不打扰休眠中的刚体
    fn apply<'js>(
        &self,
        ctx: &Ctx<'js>,
        wake: bool,
        f: impl FnOnce(&mut RigidBody, bool),
    ) -> Result<()> {
        self.write(ctx, |body| {
            if !body.is_dynamic() || (!wake && body.is_sleeping()) {
                return;
            }
            f(body, wake);
        })
    }

    fn create_fixture_from<'js>(&self, ctx: &Ctx<'js>, def: FixtureDefData) -> Result<Value<'js>> {
        let handle = self
            .entity
            .with_state(|state, body| state.create_fixture(body, &def))
            .or_throw(ctx)?;
        Fixture::wrap(ctx, self.entity.world(), handle)
    }
}

#[rquickjs::methods]
impl Body {
    // ===== 位姿 =====

    #[qjs(rename = "GetPosition")]
    pub fn get_position<'js>(&self, ctx: Ctx<'js>) -> Result<Object<'js>> {
        let position = self.read(&ctx, |body| from_vector(body.translation()))?;
        vec2_to_value(&ctx, position)
    }

    #[qjs(rename = "GetAngle")]
    pub fn get_angle<'js>(&self, ctx: Ctx<'js>) -> Result<f64> {
        self.read(&ctx, |body| body.rotation().angle() as f64)
    }

    #[qjs(rename = "SetTransform")]
    pub fn set_transform<'js>(&self, ctx: Ctx<'js>, position: Value<'js>, angle: Value<'js>) -> Result<()> {
        let position = vec2_from_value(&ctx, &position, "position")?;
        let angle = number(&ctx, &angle, "angle")?;
        self.write(&ctx, |body| {
            body.set_position(Isometry::new(to_vector(position), angle), true)
        })
    }

    #[qjs(rename = "GetWorldCenter")]
    pub fn get_world_center<'js>(&self, ctx: Ctx<'js>) -> Result<Object<'js>> {
        let center = self.read(&ctx, |body| from_point(body.center_of_mass()))?;
        vec2_to_value(&ctx, center)
    }

    // ===== 速度与阻尼 =====

    #[qjs(rename = "GetLinearVelocity")]
    pub fn get_linear_velocity<'js>(&self, ctx: Ctx<'js>) -> Result<Object<'js>> {
        let velocity = self.read(&ctx, |body| from_vector(body.linvel()))?;
        vec2_to_value(&ctx, velocity)
    }

    #[qjs(rename = "SetLinearVelocity")]
    pub fn set_linear_velocity<'js>(&self, ctx: Ctx<'js>, velocity: Value<'js>) -> Result<()> {
        let velocity = vec2_from_value(&ctx, &velocity, "velocity")?;
        self.write(&ctx, |body| {
            // 静态刚体没有速度
            if !body.is_fixed() {
                body.set_linvel(to_vector(velocity), velocity != Vec2::ZERO);
            }
        })
    }

    #[qjs(rename = "GetAngularVelocity")]
    pub fn get_angular_velocity<'js>(&self, ctx: Ctx<'js>) -> Result<f64> {
        self.read(&ctx, |body| body.angvel() as f64)
    }

    #[qjs(rename = "SetAngularVelocity")]
    pub fn set_angular_velocity<'js>(&self, ctx: Ctx<'js>, omega: Value<'js>) -> Result<()> {
        let omega = number(&ctx, &omega, "omega")?;
        self.write(&ctx, |body| {
            if !body.is_fixed() {
                body.set_angvel(omega, omega != 0.0);
            }
        })
    }

    #[qjs(rename = "GetLinearDamping")]
    pub fn get_linear_damping<'js>(&self, ctx: Ctx<'js>) -> Result<f64> {
        self.read(&ctx, |body| body.linear_damping() as f64)
    }

    #[qjs(rename = "SetLinearDamping")]
    pub fn set_linear_damping<'js>(&self, ctx: Ctx<'js>, damping: Value<'js>) -> Result<()> {
        let damping = number(&ctx, &damping, "damping")?;
        self.write(&ctx, |body| body.set_linear_damping(damping))
    }

    #[qjs(rename = "GetAngularDamping")]
    pub fn get_angular_damping<'js>(&self, ctx: Ctx<'js>) -> Result<f64> {
        self.read(&ctx, |body| body.angular_damping() as f64)
    }

    #[qjs(rename = "SetAngularDamping")]
    pub fn set_angular_damping<'js>(&self, ctx: Ctx<'js>, damping: Value<'js>) -> Result<()> {
        let damping = number(&ctx, &damping, "damping")?;
        self.write(&ctx, |body| body.set_angular_damping(damping))
    }

    #[qjs(rename = "GetGravityScale")]
    pub fn get_gravity_scale<'js>(&self, ctx: Ctx<'js>) -> Result<f64> {
        self.read(&ctx, |body| body.gravity_scale() as f64)
    }

    #[qjs(rename = "SetGravityScale")]
    pub fn set_gravity_scale<'js>(&self, ctx: Ctx<'js>, scale: Value<'js>) -> Result<()> {
        let scale = number(&ctx, &scale, "scale")?;
        self.write(&ctx, |body| body.set_gravity_scale(scale, true))
    }

    // ===== 夹具 =====

    /// `CreateFixture(def)` 或 `CreateFixture(shape, density)`
    #[qjs(rename = "CreateFixture")]
    pub fn create_fixture<'js>(
        &self,
        ctx: Ctx<'js>,
        def: Value<'js>,
        density: Opt<Value<'js>>,
    ) -> Result<Value<'js>> {
        if let Ok(def) = Class::<FixtureDef>::from_js(&ctx, def.clone()) {
            let data = def.borrow().data();
            return self.create_fixture_from(&ctx, data);
        }
        let Some(shape) = shape_from_value(&ctx, &def) else {
            return type_error(&ctx, "CreateFixture expects a b2FixtureDef or a shape");
        };
        let data = FixtureDefData {
            shape: Some(shape),
            density: optional_number(&ctx, density.0, "density", 0.0)?,
            ..Default::default()
        };
        self.create_fixture_from(&ctx, data)
    }

    #[qjs(rename = "CreateFixture2")]
    pub fn create_fixture2<'js>(
        &self,
        ctx: Ctx<'js>,
        shape: Value<'js>,
        density: Opt<Value<'js>>,
    ) -> Result<Value<'js>> {
        self.create_fixture(ctx, shape, density)
    }

    /// 仍在接触的接触对在下一次 Step 开始分发时收到 EndContact
    #[qjs(rename = "DestroyFixture")]
    pub fn destroy_fixture<'js>(&self, ctx: Ctx<'js>, fixture: Value<'js>) -> Result<()> {
        let fixture = fixture_from_value(&ctx, &fixture, "fixture")?;
        let handle = self
            .entity
            .state()
            .and_then(|state| fixture.ensure_in(&state))
            .or_throw(&ctx)?;
        self.entity
            .with_state(|state, body| {
                if state.collider_set.get(handle).and_then(|c| c.parent()) != Some(body) {
                    return Err(BridgeError::invalid_state("fixture belongs to another body"));
                }
                state.destroy_fixture(handle)
            })
            .or_throw(&ctx)
    }

    #[qjs(rename = "GetFixtures")]
    pub fn get_fixtures<'js>(&self, ctx: Ctx<'js>) -> Result<Array<'js>> {
        let fixtures = self
            .entity
            .with_state(|state, body| state.body_fixtures(body))
            .or_throw(&ctx)?;
        let array = Array::new(ctx.clone())?;
        for (index, handle) in fixtures.into_iter().enumerate() {
            array.set(index, Fixture::wrap(&ctx, self.entity.world(), handle)?)?;
        }
        Ok(array)
    }

    // ===== 力与冲量 =====

    #[qjs(rename = "ApplyForceToCenter")]
    pub fn apply_force_to_center<'js>(
        &self,
        ctx: Ctx<'js>,
        force: Value<'js>,
        wake: Opt<Value<'js>>,
    ) -> Result<()> {
        let force = vec2_from_value(&ctx, &force, "force")?;
        let wake = wake_flag(&ctx, wake)?;
        self.apply(&ctx, wake, |body, wake| body.add_force(to_vector(force), wake))
    }

    #[qjs(rename = "ApplyForce")]
    pub fn apply_force<'js>(
        &self,
        ctx: Ctx<'js>,
        force: Value<'js>,
        point: Value<'js>,
        wake: Opt<Value<'js>>,
    ) -> Result<()> {
        let force = vec2_from_value(&ctx, &force, "force")?;
        let point = vec2_from_value(&ctx, &point, "point")?;
        let wake = wake_flag(&ctx, wake)?;
        self.apply(&ctx, wake, |body, wake| {
            body.add_force_at_point(to_vector(force), to_point(point), wake)
        })
    }

    #[qjs(rename = "ApplyLinearImpulseToCenter")]
    pub fn apply_linear_impulse_to_center<'js>(
        &self,
        ctx: Ctx<'js>,
        impulse: Value<'js>,
        wake: Opt<Value<'js>>,
    ) -> Result<()> {
        let impulse = vec2_from_value(&ctx, &impulse, "impulse")?;
        let wake = wake_flag(&ctx, wake)?;
        self.apply(&ctx, wake, |body, wake| body.apply_impulse(to_vector(impulse), wake))
    }

    #[qjs(rename = "ApplyLinearImpulse")]
    pub fn apply_linear_impulse<'js>(
        &self,
        ctx: Ctx<'js>,
        impulse: Value<'js>,
        point: Value<'js>,
        wake: Opt<Value<'js>>,
    ) -> Result<()> {
        let impulse = vec2_from_value(&ctx, &impulse, "impulse")?;
        let point = vec2_from_value(&ctx, &point, "point")?;
        let wake = wake_flag(&ctx, wake)?;
        self.apply(&ctx, wake, |body, wake| {
            body.apply_impulse_at_point(to_vector(impulse), to_point(point), wake)
        })
    }

    #[qjs(rename = "ApplyTorque")]
    pub fn apply_torque<'js>(&self, ctx: Ctx<'js>, torque: Value<'js>, wake: Opt<Value<'js>>) -> Result<()> {
        let torque = number(&ctx, &torque, "torque")?;
        let wake = wake_flag(&ctx, wake)?;
        self.apply(&ctx, wake, |body, wake| body.add_torque(torque, wake))
    }

    #[qjs(rename = "ApplyAngularImpulse")]
    pub fn apply_angular_impulse<'js>(
        &self,
        ctx: Ctx<'js>,
        impulse: Value<'js>,
        wake: Opt<Value<'js>>,
    ) -> Result<()> {
        let impulse = number(&ctx, &impulse, "impulse")?;
        let wake = wake_flag(&ctx, wake)?;
        self.apply(&ctx, wake, |body, wake| body.apply_torque_impulse(impulse, wake))
    }

    // ===== 质量与类型 =====

    #[qjs(rename = "GetMass")]
    pub fn get_mass<'js>(&self, ctx: Ctx<'js>) -> Result<f64> {
        self.read(&ctx, |body| body.mass() as f64)
    }

    #[qjs(rename = "GetType")]
    pub fn get_type<'js>(&self, ctx: Ctx<'js>) -> Result<i32> {
        self.read(&ctx, |body| body_type_code(body.body_type()))
    }

    #[qjs(rename = "SetType")]
    pub fn set_type<'js>(&self, ctx: Ctx<'js>, body_type: Value<'js>) -> Result<()> {
        let code = number(&ctx, &body_type, "type")?;
        if code.fract() != 0.0 || body_type_from_code(code as i32).is_none() {
            return type_error(&ctx, format!("invalid body type {}", code));
        }
        self.entity
            .with_state(|state, body| state.set_body_type(body, code as i32))
            .or_throw(&ctx)
    }

    // ===== 状态标志 =====

    #[qjs(rename = "IsAwake")]
    pub fn is_awake<'js>(&self, ctx: Ctx<'js>) -> Result<bool> {
        self.read(&ctx, |body| !body.is_sleeping())
    }

    #[qjs(rename = "SetAwake")]
    pub fn set_awake<'js>(&self, ctx: Ctx<'js>, awake: Value<'js>) -> Result<()> {
        let awake = boolean(&ctx, &awake, "awake")?;
        self.write(&ctx, |body| {
            if awake {
                body.wake_up(true);
            } else {
                body.sleep();
            }
        })
    }

    #[qjs(rename = "IsEnabled")]
    pub fn is_enabled<'js>(&self, ctx: Ctx<'js>) -> Result<bool> {
        self.read(&ctx, |body| body.is_enabled())
    }

    #[qjs(rename = "SetEnabled")]
    pub fn set_enabled<'js>(&self, ctx: Ctx<'js>, enabled: Value<'js>) -> Result<()> {
        let enabled = boolean(&ctx, &enabled, "enabled")?;
        self.write(&ctx, |body| body.set_enabled(enabled))
    }

    #[qjs(rename = "IsBullet")]
    pub fn is_bullet<'js>(&self, ctx: Ctx<'js>) -> Result<bool> {
        self.read(&ctx, |body| body.is_ccd_enabled())
    }

    #[qjs(rename = "SetBullet")]
    pub fn set_bullet<'js>(&self, ctx: Ctx<'js>, bullet: Value<'js>) -> Result<()> {
        let bullet = boolean(&ctx, &bullet, "bullet")?;
        self.write(&ctx, |body| body.enable_ccd(bullet))
    }

    #[qjs(rename = "IsFixedRotation")]
    pub fn is_fixed_rotation<'js>(&self, ctx: Ctx<'js>) -> Result<bool> {
        self.read(&ctx, |body| body.locked_axes().contains(LockedAxes::ROTATION_LOCKED))
    }

    #[qjs(rename = "SetFixedRotation")]
    pub fn set_fixed_rotation<'js>(&self, ctx: Ctx<'js>, fixed: Value<'js>) -> Result<()> {
        let fixed = boolean(&ctx, &fixed, "fixedRotation")?;
        self.write(&ctx, |body| {
            body.lock_rotations(fixed, true);
            if fixed {
                body.set_angvel(0.0, false);
            }
        })
    }

    // ===== 用户数据 =====

    #[qjs(rename = "GetUserData")]
    pub fn get_user_data<'js>(&self, ctx: Ctx<'js>) -> Result<f64> {
        self.read(&ctx, |body| body.user_data as u64 as f64)
    }

    #[qjs(rename = "SetUserData")]
    pub fn set_user_data<'js>(&self, ctx: Ctx<'js>, data: Value<'js>) -> Result<()> {
        let tag = user_data_tag(&ctx, &data)?;
        self.write(&ctx, |body| body.user_data = tag as u128)
    }
}

/// 从 `b2Body` 宿主对象取出句柄；其他值抛 `TypeError`
pub fn body_from_value<'js>(
    ctx: &Ctx<'js>,
    value: &Value<'js>,
    what: &str,
) -> Result<EntityRef<RigidBodyHandle>> {
    match Class::<Body>::from_js(ctx, value.clone()) {
        Ok(body) => Ok(body.borrow().entity.clone()),
        Err(_) => type_error(ctx, format!("{} must be a b2Body", what)),
    }
}
