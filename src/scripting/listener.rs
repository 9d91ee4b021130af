//! 接触监听
//!
//! - [`JsContactListener`]：脚本创建的 `JSContactListener`，四个回调属性
//! - [`ListenerSlot`]：`b2World` 持有的监听器强引用
//! - [`ScriptContactListener`]：步进期间实现 [`ContactListener`] 的适配器，只活在一次分发里

use std::cell::RefCell;

use rquickjs::class::{Trace, Tracer};
use rquickjs::function::This;
use rquickjs::{Class, Ctx, FromJs, Function, IntoJs, Object, Value};

use super::carriers::StateRef;
use super::contact::{Contact, ContactCell};
use crate::physics::{ContactEventKind, ContactImpulse, ContactListener, ContactSnapshot};

/// `JSContactListener`
///
/// 属性只接受函数，其他值的赋值被忽略；未设置的回调在分发时跳过。
#[derive(Trace, Default)]
#[rquickjs::class(rename = "JSContactListener")]
pub struct JsContactListener<'js> {
    begin_contact: Option<Function<'js>>,
    end_contact: Option<Function<'js>>,
    pre_solve: Option<Function<'js>>,
    post_solve: Option<Function<'js>>,
}

impl<'js> JsContactListener<'js> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn callback(&self, kind: ContactEventKind) -> Option<Function<'js>> {
        match kind {
            ContactEventKind::Begin => self.begin_contact.clone(),
            ContactEventKind::End => self.end_contact.clone(),
            ContactEventKind::PreSolve => self.pre_solve.clone(),
            ContactEventKind::PostSolve => self.post_solve.clone(),
        }
    }

    fn assign(slot: &mut Option<Function<'js>>, value: Value<'js>) {
        if let Some(function) = value.into_function() {
            *slot = Some(function);
        }
    }
}

#[rquickjs::methods]
impl<'js> JsContactListener<'js> {
    #[qjs(get, rename = "BeginContact")]
    pub fn get_begin_contact(&self) -> Option<Function<'js>> {
        self.begin_contact.clone()
    }

    #[qjs(set, rename = "BeginContact")]
    pub fn set_begin_contact(&mut self, value: Value<'js>) {
        Self::assign(&mut self.begin_contact, value);
    }

    #[qjs(get, rename = "EndContact")]
    pub fn get_end_contact(&self) -> Option<Function<'js>> {
        self.end_contact.clone()
    }

    #[qjs(set, rename = "EndContact")]
    pub fn set_end_contact(&mut self, value: Value<'js>) {
        Self::assign(&mut self.end_contact, value);
    }

    #[qjs(get, rename = "PreSolve")]
    pub fn get_pre_solve(&self) -> Option<Function<'js>> {
        self.pre_solve.clone()
    }

    #[qjs(set, rename = "PreSolve")]
    pub fn set_pre_solve(&mut self, value: Value<'js>) {
        Self::assign(&mut self.pre_solve, value);
    }

    #[qjs(get, rename = "PostSolve")]
    pub fn get_post_solve(&self) -> Option<Function<'js>> {
        self.post_solve.clone()
    }

    #[qjs(set, rename = "PostSolve")]
    pub fn set_post_solve(&mut self, value: Value<'js>) {
        Self::assign(&mut self.post_solve, value);
    }
}

// ===== 世界持有的引用 =====

/// 世界当前的监听器；替换后旧监听器随之释放
#[derive(Default)]
pub struct ListenerSlot<'js>(RefCell<Option<Class<'js, JsContactListener<'js>>>>);

impl<'js> ListenerSlot<'js> {
    pub fn current(&self) -> Option<Class<'js, JsContactListener<'js>>> {
        self.0.borrow().clone()
    }

    /// 安装新的监听器；不是 `JSContactListener` 时忽略并返回 `false`
    pub fn install(&self, ctx: &Ctx<'js>, value: &Value<'js>) -> bool {
        match Class::<JsContactListener>::from_js(ctx, value.clone()) {
            Ok(listener) => {
                *self.0.borrow_mut() = Some(listener);
                true
            }
            Err(_) => false,
        }
    }
}

impl<'js> Trace<'js> for ListenerSlot<'js> {
    fn trace<'a>(&self, tracer: Tracer<'a, 'js>) {
        if let Ok(slot) = self.0.try_borrow() {
            if let Some(listener) = slot.as_ref() {
                listener.trace(tracer);
            }
        }
    }
}

// ===== 分发适配器 =====

/// 步进期间把引擎接触事件转成脚本回调
///
/// 每个事件都重新读取槽位，回调里调用 `SetContactListener` 之后的事件交给新监听器。
pub struct ScriptContactListener<'a, 'js> {
    ctx: Ctx<'js>,
    slot: &'a ListenerSlot<'js>,
    world: StateRef,
}

impl<'a, 'js> ScriptContactListener<'a, 'js> {
    pub fn new(ctx: Ctx<'js>, slot: &'a ListenerSlot<'js>, world: StateRef) -> Self {
        Self { ctx, slot, world }
    }

    fn invoke(
        &self,
        kind: ContactEventKind,
        contact: ContactSnapshot,
        impulse: Option<ContactImpulse>,
    ) -> rquickjs::Result<()> {
        let Some(listener) = self.slot.current() else {
            return Ok(());
        };
        let Some(callback) = listener.borrow().callback(kind) else {
            return Ok(());
        };

        let cell = ContactCell::new(contact);
        let wrapper = Class::instance(self.ctx.clone(), Contact::new(cell.clone(), self.world.clone()))?;
        let result = match impulse {
            Some(impulse) => {
                let impulse = impulse_to_value(&self.ctx, &impulse)?;
                callback.call::<_, Value>((This(listener.clone()), wrapper, impulse))
            }
            None => callback.call::<_, Value>((This(listener.clone()), wrapper)),
        };
        cell.expire();
        result.map(|_| ())
    }
}

impl<'a, 'js> ContactListener for ScriptContactListener<'a, 'js> {
    type Error = rquickjs::Error;

    fn wants(&self, event: ContactEventKind) -> bool {
        match self.slot.current() {
            Some(listener) => {
                let wanted = listener.borrow().callback(event).is_some();
                wanted
            }
            None => false,
        }
    }

    fn begin_contact(&mut self, contact: ContactSnapshot) -> rquickjs::Result<()> {
        self.invoke(ContactEventKind::Begin, contact, None)
    }

    fn end_contact(&mut self, contact: ContactSnapshot) -> rquickjs::Result<()> {
        self.invoke(ContactEventKind::End, contact, None)
    }

    fn pre_solve(&mut self, contact: ContactSnapshot) -> rquickjs::Result<()> {
        self.invoke(ContactEventKind::PreSolve, contact, None)
    }

    fn post_solve(&mut self, contact: ContactSnapshot, impulse: ContactImpulse) -> rquickjs::Result<()> {
        self.invoke(ContactEventKind::PostSolve, contact, Some(impulse))
    }
}

/// `{normalImpulses, tangentImpulses, count}`
pub fn impulse_to_value<'js>(ctx: &Ctx<'js>, impulse: &ContactImpulse) -> rquickjs::Result<Object<'js>> {
    let object = Object::new(ctx.clone())?;
    let normals: Vec<f64> = impulse.normal_impulses.iter().map(|n| *n as f64).collect();
    let tangents: Vec<f64> = impulse.tangent_impulses.iter().map(|t| *t as f64).collect();
    object.set("normalImpulses", normals.into_js(ctx)?)?;
    object.set("tangentImpulses", tangents.into_js(ctx)?)?;
    object.set("count", impulse.count() as i32)?;
    Ok(object)
}
