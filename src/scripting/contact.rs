//! 接触包装：`b2Contact` 与 `b2WorldManifold`
//!
//! `b2Contact` 只在回调期间有效，回调返回后视图被标记为过期，之后的任何调用都抛
//! `InvalidState`。流形是调用时的拷贝。

use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;

use rquickjs::class::{Trace, Tracer};
use rquickjs::{Array, Class, Ctx, IntoJs, Object, Result, Value};

use super::carriers::StateRef;
use super::fixture::Fixture;
use super::vec2::{boolean, vec2_to_value};
use crate::core::{BridgeError, BridgeResult, OrThrow};
use crate::physics::{ContactSnapshot, WorldManifold};

struct ContactView {
    snapshot: RefCell<ContactSnapshot>,
    live: Cell<bool>,
}

/// 回调期间的接触视图，分发方在回调返回后调用 [`ContactCell::expire`]
#[derive(Clone)]
pub struct ContactCell(Rc<ContactView>);

impl ContactCell {
    pub fn new(snapshot: ContactSnapshot) -> Self {
        Self(Rc::new(ContactView {
            snapshot: RefCell::new(snapshot),
            live: Cell::new(true),
        }))
    }

    pub fn expire(&self) {
        self.0.live.set(false);
    }

    pub fn is_live(&self) -> bool {
        self.0.live.get()
    }

    fn snapshot(&self) -> BridgeResult<Ref<'_, ContactSnapshot>> {
        if !self.is_live() {
            return Err(BridgeError::invalid_state(
                "contact is only valid inside the callback",
            ));
        }
        Ok(self.0.snapshot.borrow())
    }
}

impl<'js> Trace<'js> for ContactCell {
    fn trace<'a>(&self, _tracer: Tracer<'a, 'js>) {}
}

/// `b2Contact`
#[derive(Trace)]
#[rquickjs::class(rename = "b2Contact")]
pub struct Contact {
    view: ContactCell,
    world: StateRef,
}

impl Contact {
    pub fn new(view: ContactCell, world: StateRef) -> Self {
        Self { view, world }
    }

    fn with<'js, R>(&self, ctx: &Ctx<'js>, f: impl FnOnce(&ContactSnapshot) -> R) -> Result<R> {
        let snapshot = self.view.snapshot().or_throw(ctx)?;
        Ok(f(&snapshot))
    }
}

#[rquickjs::methods]
impl Contact {
    #[qjs(rename = "GetFixtureA")]
    pub fn get_fixture_a<'js>(&self, ctx: Ctx<'js>) -> Result<Value<'js>> {
        let fixture = self.with(&ctx, |contact| contact.fixture_a)?;
        Fixture::wrap(&ctx, &self.world, fixture)
    }

    #[qjs(rename = "GetFixtureB")]
    pub fn get_fixture_b<'js>(&self, ctx: Ctx<'js>) -> Result<Value<'js>> {
        let fixture = self.with(&ctx, |contact| contact.fixture_b)?;
        Fixture::wrap(&ctx, &self.world, fixture)
    }

    #[qjs(rename = "IsTouching")]
    pub fn is_touching<'js>(&self, ctx: Ctx<'js>) -> Result<bool> {
        self.with(&ctx, |contact| contact.touching)
    }

    #[qjs(rename = "IsEnabled")]
    pub fn is_enabled<'js>(&self, ctx: Ctx<'js>) -> Result<bool> {
        self.with(&ctx, |contact| contact.enabled)
    }

    /// 关闭后下一次求解忽略这个接触对，步进结束后自动恢复
    #[qjs(rename = "SetEnabled")]
    pub fn set_enabled<'js>(&self, ctx: Ctx<'js>, enabled: Value<'js>) -> Result<()> {
        let enabled = boolean(&ctx, &enabled, "enabled")?;
        let (a, b) = self.with(&ctx, |contact| (contact.fixture_a, contact.fixture_b))?;
        let state = self.world.upgrade().or_throw(&ctx)?;
        state
            .try_borrow_mut()
            .map_err(|_| BridgeError::invalid_state("world is busy"))
            .or_throw(&ctx)?
            .set_contact_enabled(a, b, enabled);
        self.view.0.snapshot.borrow_mut().enabled = enabled;
        Ok(())
    }

    #[qjs(rename = "GetFriction")]
    pub fn get_friction<'js>(&self, ctx: Ctx<'js>) -> Result<f64> {
        self.with(&ctx, |contact| contact.friction as f64)
    }

    #[qjs(rename = "GetRestitution")]
    pub fn get_restitution<'js>(&self, ctx: Ctx<'js>) -> Result<f64> {
        self.with(&ctx, |contact| contact.restitution as f64)
    }

    /// `{pointCount, localNormal, localPoint}`
    #[qjs(rename = "GetManifold")]
    pub fn get_manifold<'js>(&self, ctx: Ctx<'js>) -> Result<Object<'js>> {
        let manifold = self.with(&ctx, |contact| contact.manifold)?;
        let object = Object::new(ctx.clone())?;
        object.set("pointCount", manifold.point_count as i32)?;
        object.set("localNormal", vec2_to_value(&ctx, manifold.local_normal)?)?;
        object.set("localPoint", vec2_to_value(&ctx, manifold.local_point)?)?;
        Ok(object)
    }

    #[qjs(rename = "GetWorldManifold")]
    pub fn get_world_manifold<'js>(&self, ctx: Ctx<'js>) -> Result<Value<'js>> {
        let manifold = self.with(&ctx, |contact| contact.world_manifold.clone())?;
        Class::instance(ctx.clone(), JsWorldManifold { manifold: ManifoldCopy(manifold) })?
            .into_js(&ctx)
    }
}

// ===== 世界流形 =====

struct ManifoldCopy(WorldManifold);

impl<'js> Trace<'js> for ManifoldCopy {
    fn trace<'a>(&self, _tracer: Tracer<'a, 'js>) {}
}

/// `b2WorldManifold`，持有一份拷贝，字段在读取时转换
#[derive(Trace)]
#[rquickjs::class(rename = "b2WorldManifold")]
pub struct JsWorldManifold {
    manifold: ManifoldCopy,
}

#[rquickjs::methods]
impl JsWorldManifold {
    #[qjs(get, rename = "normal")]
    pub fn normal<'js>(&self, ctx: Ctx<'js>) -> Result<Object<'js>> {
        vec2_to_value(&ctx, self.manifold.0.normal)
    }

    #[qjs(get, rename = "points")]
    pub fn points<'js>(&self, ctx: Ctx<'js>) -> Result<Array<'js>> {
        let array = Array::new(ctx.clone())?;
        for (index, point) in self.manifold.0.points.iter().enumerate() {
            array.set(index, vec2_to_value(&ctx, *point)?)?;
        }
        Ok(array)
    }

    #[qjs(get, rename = "separations")]
    pub fn separations<'js>(&self, ctx: Ctx<'js>) -> Result<Array<'js>> {
        let array = Array::new(ctx.clone())?;
        for (index, separation) in self.manifold.0.separations.iter().enumerate() {
            array.set(index, *separation as f64)?;
        }
        Ok(array)
    }

    #[qjs(get, rename = "pointCount")]
    pub fn point_count(&self) -> usize {
        self.manifold.0.point_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rapier2d::prelude::ColliderHandle;

    fn snapshot() -> ContactSnapshot {
        ContactSnapshot {
            fixture_a: ColliderHandle::invalid(),
            fixture_b: ColliderHandle::invalid(),
            touching: true,
            enabled: true,
            sensor: false,
            friction: 0.2,
            restitution: 0.0,
            manifold: Default::default(),
            world_manifold: Default::default(),
            impulse: Default::default(),
        }
    }

    #[test]
    fn test_contact_cell_expires() {
        let cell = ContactCell::new(snapshot());
        let alias = cell.clone();
        assert!(alias.snapshot().is_ok());
        cell.expire();
        assert!(!alias.is_live());
        assert!(matches!(alias.snapshot(), Err(BridgeError::InvalidState(_))));
    }
}
