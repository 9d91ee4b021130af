//! 射线与 AABB 查询的脚本适配器
//!
//! 回调对象必须带有 `ReportFixture` 方法，调用时以回调对象本身作为 `this`。

use rapier2d::prelude::*;
use rquickjs::function::This;
use rquickjs::{Ctx, Function, Object, Value};

use super::carriers::StateRef;
use super::fixture::Fixture;
use super::vec2::vec2_to_value;
use crate::core::{BridgeError, BridgeResult, OrThrow};
use crate::physics::{QueryCallback, RayCastCallback, RayHit};

/// 取出回调对象和它的 `ReportFixture`
fn report_method<'js>(ctx: &Ctx<'js>, callback: &Value<'js>) -> rquickjs::Result<(Object<'js>, Function<'js>)> {
    let Some(object) = callback.as_object() else {
        return Err(BridgeError::MissingCallback.throw(ctx));
    };
    let report: Value = object.get("ReportFixture")?;
    match report.into_function() {
        Some(function) => Ok((object.clone(), function)),
        None => Err(BridgeError::MissingCallback.throw(ctx)),
    }
}

/// 夹具在回调之间可能被删除，只报告仍然存在的
fn fixture_alive(world: &StateRef, fixture: ColliderHandle) -> BridgeResult<bool> {
    let state = world.upgrade()?;
    let alive = match state.try_borrow() {
        Ok(state) => state.collider_set.contains(fixture),
        Err(_) => true,
    };
    Ok(alive)
}

// ===== 射线 =====

/// `b2RayCastCallback` 适配器
pub struct ScriptRayCast<'js> {
    ctx: Ctx<'js>,
    this: Object<'js>,
    report: Function<'js>,
    world: StateRef,
}

impl<'js> ScriptRayCast<'js> {
    pub fn new(ctx: &Ctx<'js>, callback: &Value<'js>, world: StateRef) -> rquickjs::Result<Self> {
        let (this, report) = report_method(ctx, callback)?;
        Ok(Self { ctx: ctx.clone(), this, report, world })
    }
}

impl<'js> RayCastCallback for ScriptRayCast<'js> {
    type Error = rquickjs::Error;

    /// 返回值不是数字时按 1 处理 (继续，不裁剪)
    fn report_fixture(&mut self, hit: &RayHit) -> rquickjs::Result<Real> {
        if !fixture_alive(&self.world, hit.fixture).or_throw(&self.ctx)? {
            return Ok(-1.0);
        }
        let fixture = Fixture::wrap(&self.ctx, &self.world, hit.fixture)?;
        let point = vec2_to_value(&self.ctx, hit.point)?;
        let normal = vec2_to_value(&self.ctx, hit.normal)?;
        let result: Value = self.report.call((
            This(self.this.clone()),
            fixture,
            point,
            normal,
            hit.fraction as f64,
        ))?;
        Ok(result.as_number().map(|n| n as Real).unwrap_or(1.0))
    }
}

// ===== AABB =====

/// `b2QueryCallback` 适配器
pub struct ScriptQuery<'js> {
    ctx: Ctx<'js>,
    this: Object<'js>,
    report: Function<'js>,
    world: StateRef,
}

impl<'js> ScriptQuery<'js> {
    pub fn new(ctx: &Ctx<'js>, callback: &Value<'js>, world: StateRef) -> rquickjs::Result<Self> {
        let (this, report) = report_method(ctx, callback)?;
        Ok(Self { ctx: ctx.clone(), this, report, world })
    }
}

impl<'js> QueryCallback for ScriptQuery<'js> {
    type Error = rquickjs::Error;

    /// 返回值不是布尔值时按 `true` 处理
    fn report_fixture(&mut self, fixture: ColliderHandle) -> rquickjs::Result<bool> {
        if !fixture_alive(&self.world, fixture).or_throw(&self.ctx)? {
            return Ok(true);
        }
        let wrapper = Fixture::wrap(&self.ctx, &self.world, fixture)?;
        let result: Value = self.report.call((This(self.this.clone()), wrapper))?;
        Ok(result.as_bool().unwrap_or(true))
    }
}
