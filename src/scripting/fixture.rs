//! `b2Fixture` 包装

use rapier2d::prelude::*;
use rquickjs::class::Trace;
use rquickjs::{Class, Ctx, FromJs, IntoJs, Object, Result, Value};

use super::body::Body;
use super::carriers::{EntityRef, StateRef};
use super::defs::{filter_from_value, filter_to_value};
use super::vec2::{boolean, number, type_error, vec2_from_value};
use crate::core::{BridgeError, OrThrow};
use crate::physics::{to_point, FilterData};

/// `b2Fixture`
#[derive(Trace)]
#[rquickjs::class(rename = "b2Fixture")]
pub struct Fixture {
    entity: EntityRef<ColliderHandle>,
}

impl Fixture {
    pub fn wrap<'js>(ctx: &Ctx<'js>, world: &StateRef, handle: ColliderHandle) -> Result<Value<'js>> {
        let entity = EntityRef::from_world(world, handle);
        Class::instance(ctx.clone(), Fixture { entity })?.into_js(ctx)
    }

    fn read<'js, R>(&self, ctx: &Ctx<'js>, f: impl FnOnce(&Collider) -> R) -> Result<R> {
        self.entity.read(f).or_throw(ctx)
    }

    fn write<'js, R>(&self, ctx: &Ctx<'js>, f: impl FnOnce(&mut Collider) -> R) -> Result<R> {
        self.entity.write(f).or_throw(ctx)
    }
}

#[rquickjs::methods]
impl Fixture {
    #[qjs(rename = "GetBody")]
    pub fn get_body<'js>(&self, ctx: Ctx<'js>) -> Result<Value<'js>> {
        let parent = self
            .entity
            .read(|collider| collider.parent())
            .and_then(|parent| parent.ok_or_else(|| BridgeError::invalid_state("fixture has no body")))
            .or_throw(&ctx)?;
        Body::wrap(&ctx, self.entity.world(), parent)
    }

    #[qjs(rename = "IsSensor")]
    pub fn is_sensor<'js>(&self, ctx: Ctx<'js>) -> Result<bool> {
        self.read(&ctx, |collider| collider.is_sensor())
    }

    #[qjs(rename = "SetSensor")]
    pub fn set_sensor<'js>(&self, ctx: Ctx<'js>, sensor: Value<'js>) -> Result<()> {
        let sensor = boolean(&ctx, &sensor, "sensor")?;
        self.write(&ctx, |collider| collider.set_sensor(sensor))
    }

    #[qjs(rename = "GetDensity")]
    pub fn get_density<'js>(&self, ctx: Ctx<'js>) -> Result<f64> {
        self.read(&ctx, |collider| collider.density() as f64)
    }

    #[qjs(rename = "SetDensity")]
    pub fn set_density<'js>(&self, ctx: Ctx<'js>, density: Value<'js>) -> Result<()> {
        let density = number(&ctx, &density, "density")?;
        self.entity
            .with_state(|state, fixture| state.set_fixture_density(fixture, density))
            .or_throw(&ctx)
    }

    #[qjs(rename = "GetFriction")]
    pub fn get_friction<'js>(&self, ctx: Ctx<'js>) -> Result<f64> {
        self.read(&ctx, |collider| collider.friction() as f64)
    }

    #[qjs(rename = "SetFriction")]
    pub fn set_friction<'js>(&self, ctx: Ctx<'js>, friction: Value<'js>) -> Result<()> {
        let friction = number(&ctx, &friction, "friction")?;
        self.write(&ctx, |collider| collider.set_friction(friction))
    }

    #[qjs(rename = "GetRestitution")]
    pub fn get_restitution<'js>(&self, ctx: Ctx<'js>) -> Result<f64> {
        self.read(&ctx, |collider| collider.restitution() as f64)
    }

    #[qjs(rename = "SetRestitution")]
    pub fn set_restitution<'js>(&self, ctx: Ctx<'js>, restitution: Value<'js>) -> Result<()> {
        let restitution = number(&ctx, &restitution, "restitution")?;
        self.write(&ctx, |collider| collider.set_restitution(restitution))
    }

    #[qjs(rename = "GetFilterData")]
    pub fn get_filter_data<'js>(&self, ctx: Ctx<'js>) -> Result<Object<'js>> {
        let filter = self.read(&ctx, |collider| FilterData::unpack(collider.user_data))?;
        filter_to_value(&ctx, &filter)
    }

    /// 只覆盖提供了的字段；唤醒所属刚体，让休眠的接触对重新过滤
    #[qjs(rename = "SetFilterData")]
    pub fn set_filter_data<'js>(&self, ctx: Ctx<'js>, filter: Value<'js>) -> Result<()> {
        let update = filter_from_value(&ctx, &filter)?;
        self.entity
            .with_state(|state, fixture| {
                let Some(collider) = state.collider_set.get_mut(fixture) else {
                    return Ok(());
                };
                let mut data = FilterData::unpack(collider.user_data);
                data.apply(&update);
                collider.user_data = data.pack();
                if let Some(body) = collider.parent().and_then(|p| state.rigid_body_set.get_mut(p)) {
                    body.wake_up(true);
                }
                Ok(())
            })
            .or_throw(&ctx)
    }

    #[qjs(rename = "TestPoint")]
    pub fn test_point<'js>(&self, ctx: Ctx<'js>, point: Value<'js>) -> Result<bool> {
        let point = to_point(vec2_from_value(&ctx, &point, "point")?);
        self.read(&ctx, |collider| {
            collider.shape().contains_point(collider.position(), &point)
        })
    }
}

/// 从 `b2Fixture` 宿主对象取出句柄
pub fn fixture_from_value<'js>(
    ctx: &Ctx<'js>,
    value: &Value<'js>,
    what: &str,
) -> Result<EntityRef<ColliderHandle>> {
    match Class::<Fixture>::from_js(ctx, value.clone()) {
        Ok(fixture) => Ok(fixture.borrow().entity.clone()),
        Err(_) => type_error(ctx, format!("{} must be a b2Fixture", what)),
    }
}
