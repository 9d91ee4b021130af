//! 句柄与定义载体
//!
//! - [`EntityRef`]：实体包装持有的非拥有句柄 (世界的弱引用 + Rapier 代数句柄)
//! - [`SharedDef`]：定义包装持有的共享定义结构
//! - [`WorldCell`]：`b2World` 持有的世界状态强引用
//!
//! 这些载体都不包含脚本值，垃圾回收遍历时无需处理，`Trace` 实现为空。

use std::cell::{Ref, RefCell, RefMut};
use std::rc::{Rc, Weak};

use rquickjs::class::{Trace, Tracer};

use crate::core::{BridgeError, BridgeResult};
use crate::physics::{EngineHandle, PhysicsState};

/// 共享的世界状态
pub type SharedState = Rc<RefCell<PhysicsState>>;

fn busy() -> BridgeError {
    BridgeError::invalid_state("world is busy")
}

// ===== 世界 =====

/// `b2World` 持有的状态
pub struct WorldCell(SharedState);

impl WorldCell {
    pub fn new(state: PhysicsState) -> Self {
        Self(state.into_shared())
    }

    pub fn shared(&self) -> &SharedState {
        &self.0
    }

    pub fn read(&self) -> BridgeResult<Ref<'_, PhysicsState>> {
        self.0.try_borrow().map_err(|_| busy())
    }

    pub fn write(&self) -> BridgeResult<RefMut<'_, PhysicsState>> {
        self.0.try_borrow_mut().map_err(|_| busy())
    }
}

impl<'js> Trace<'js> for WorldCell {
    fn trace<'a>(&self, _tracer: Tracer<'a, 'js>) {}
}

/// 世界状态的弱引用
#[derive(Clone)]
pub struct StateRef(Weak<RefCell<PhysicsState>>);

impl StateRef {
    pub fn new(state: &SharedState) -> Self {
        Self(Rc::downgrade(state))
    }

    pub fn upgrade(&self) -> BridgeResult<SharedState> {
        self.0
            .upgrade()
            .ok_or_else(|| BridgeError::invalid_state("world has been destroyed"))
    }

    /// 是否指向同一个世界
    pub fn is(&self, state: &SharedState) -> bool {
        std::ptr::eq(self.0.as_ptr(), Rc::as_ptr(state))
    }
}

impl<'js> Trace<'js> for StateRef {
    fn trace<'a>(&self, _tracer: Tracer<'a, 'js>) {}
}

// ===== 实体句柄 =====

/// 实体句柄载体
///
/// 不拥有实体；每次访问都重新解析句柄，实体已被销毁或世界已被回收时返回
/// `InvalidState`。
pub struct EntityRef<H: EngineHandle> {
    world: StateRef,
    handle: H,
}

impl<H: EngineHandle> Clone for EntityRef<H> {
    fn clone(&self) -> Self {
        Self {
            world: self.world.clone(),
            handle: self.handle,
        }
    }
}

impl<H: EngineHandle> EntityRef<H> {
    pub fn new(state: &SharedState, handle: H) -> Self {
        Self {
            world: StateRef::new(state),
            handle,
        }
    }

    pub fn from_world(world: &StateRef, handle: H) -> Self {
        Self {
            world: world.clone(),
            handle,
        }
    }

    pub fn handle(&self) -> H {
        self.handle
    }

    pub fn world(&self) -> &StateRef {
        &self.world
    }

    pub fn state(&self) -> BridgeResult<SharedState> {
        self.world.upgrade()
    }

    /// 是否属于给定的世界
    pub fn belongs_to(&self, state: &SharedState) -> bool {
        self.world.is(state)
    }

    /// 要求句柄属于给定世界且实体仍然存活
    pub fn ensure_in(&self, state: &SharedState) -> BridgeResult<H> {
        if !self.belongs_to(state) {
            return Err(BridgeError::invalid_state(format!(
                "{} belongs to another world",
                H::KIND.name()
            )));
        }
        self.read(|_| ())?;
        Ok(self.handle)
    }

    fn dangling() -> BridgeError {
        BridgeError::invalid_state(format!("{} has been destroyed", H::KIND.name()))
    }

    /// 只读访问实体
    pub fn read<R>(&self, f: impl FnOnce(&H::Target) -> R) -> BridgeResult<R> {
        let state = self.state()?;
        let guard = state.try_borrow().map_err(|_| busy())?;
        let target = H::lookup(&guard, self.handle).ok_or_else(Self::dangling)?;
        Ok(f(target))
    }

    /// 可变访问实体
    pub fn write<R>(&self, f: impl FnOnce(&mut H::Target) -> R) -> BridgeResult<R> {
        let state = self.state()?;
        let mut guard = state.try_borrow_mut().map_err(|_| busy())?;
        let target = H::lookup_mut(&mut guard, self.handle).ok_or_else(Self::dangling)?;
        Ok(f(target))
    }

    /// 需要整个世界状态的操作 (创建夹具、修改类型等)
    pub fn with_state<R>(
        &self,
        f: impl FnOnce(&mut PhysicsState, H) -> BridgeResult<R>,
    ) -> BridgeResult<R> {
        let state = self.state()?;
        let mut guard = state.try_borrow_mut().map_err(|_| busy())?;
        if H::lookup(&guard, self.handle).is_none() {
            return Err(Self::dangling());
        }
        f(&mut guard, self.handle)
    }
}

impl<'js, H: EngineHandle> Trace<'js> for EntityRef<H> {
    fn trace<'a>(&self, _tracer: Tracer<'a, 'js>) {}
}

// ===== 定义 =====

/// 共享定义载体，最后一个引用释放时定义随之释放
pub struct SharedDef<T>(Rc<RefCell<T>>);

impl<T> Clone for SharedDef<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> SharedDef<T> {
    pub fn new(value: T) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    pub fn from_rc(cell: Rc<RefCell<T>>) -> Self {
        Self(cell)
    }

    /// 底层共享指针
    pub fn rc(&self) -> Rc<RefCell<T>> {
        self.0.clone()
    }

    pub fn get(&self) -> Ref<'_, T> {
        self.0.borrow()
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.0.borrow_mut())
    }
}

impl<T: Clone> SharedDef<T> {
    /// 拷贝当前内容
    pub fn snapshot(&self) -> T {
        self.0.borrow().clone()
    }
}

impl<'js, T> Trace<'js> for SharedDef<T> {
    fn trace<'a>(&self, _tracer: Tracer<'a, 'js>) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::physics::BodyDefData;
    use glam::Vec2;

    fn shared_world() -> SharedState {
        PhysicsState::new(Vec2::ZERO, &SimulationConfig::default()).into_shared()
    }

    #[test]
    fn test_entity_ref_detects_destroyed_body() {
        let state = shared_world();
        let handle = state.borrow_mut().create_body(&BodyDefData::default()).unwrap();
        let body = EntityRef::new(&state, handle);
        assert!(body.read(|b| b.is_fixed()).unwrap());

        state.borrow_mut().destroy_body(handle).unwrap();
        let err = body.read(|_| ()).unwrap_err();
        assert_eq!(err.to_string(), "InvalidState: body has been destroyed");
    }

    #[test]
    fn test_entity_ref_detects_dropped_world() {
        let state = shared_world();
        let handle = state.borrow_mut().create_body(&BodyDefData::default()).unwrap();
        let body = EntityRef::new(&state, handle);
        drop(state);
        assert!(matches!(body.write(|_| ()), Err(BridgeError::InvalidState(_))));
    }

    #[test]
    fn test_entity_ref_world_membership() {
        let first = shared_world();
        let second = shared_world();
        let handle = first.borrow_mut().create_body(&BodyDefData::default()).unwrap();
        let body = EntityRef::new(&first, handle);
        assert!(body.ensure_in(&first).is_ok());
        assert!(body.ensure_in(&second).is_err());
    }

    #[test]
    fn test_shared_def_snapshot_is_a_copy() {
        let def = SharedDef::new(BodyDefData::default());
        let alias = def.clone();
        let before = def.snapshot();
        alias.update(|d| d.angle = 1.0);
        assert_eq!(before.angle, 0.0);
        assert_eq!(def.get().angle, 1.0);
    }
}
