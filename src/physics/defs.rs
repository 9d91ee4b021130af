//! 刚体与夹具定义
//!
//! 定义是纯数据，被工厂方法拷贝进 Rapier 的构建器；同一个定义可以被消费任意多次。

use glam::Vec2;
use rapier2d::prelude::*;

use super::shapes::ShapeCell;
use super::{body_type_from_code, to_vector};
use crate::impl_default;

/// 刚体定义 (`b2BodyDef`)
#[derive(Debug, Clone)]
pub struct BodyDefData {
    /// 0 static, 1 kinematic, 2 dynamic
    pub body_type: i32,
    pub position: Vec2,
    pub angle: Real,
    pub linear_velocity: Vec2,
    pub angular_velocity: Real,
    pub linear_damping: Real,
    pub angular_damping: Real,
    pub allow_sleep: bool,
    pub awake: bool,
    pub fixed_rotation: bool,
    pub bullet: bool,
    pub enabled: bool,
    pub gravity_scale: Real,
    pub user_data: u64,
}

impl_default!(BodyDefData {
    body_type: 0,
    position: Vec2::ZERO,
    angle: 0.0,
    linear_velocity: Vec2::ZERO,
    angular_velocity: 0.0,
    linear_damping: 0.0,
    angular_damping: 0.0,
    allow_sleep: true,
    awake: true,
    fixed_rotation: false,
    bullet: false,
    enabled: true,
    gravity_scale: 1.0,
    user_data: 0,
});

impl BodyDefData {
    /// 转换为 Rapier 刚体
    pub fn to_rigid_body(&self) -> RigidBody {
        let body_type = body_type_from_code(self.body_type).unwrap_or(RigidBodyType::Fixed);
        let mut builder = RigidBodyBuilder::new(body_type)
            .translation(to_vector(self.position))
            .rotation(self.angle)
            .linvel(to_vector(self.linear_velocity))
            .angvel(self.angular_velocity)
            .linear_damping(self.linear_damping)
            .angular_damping(self.angular_damping)
            .can_sleep(self.allow_sleep)
            .sleeping(!self.awake)
            .ccd_enabled(self.bullet)
            .enabled(self.enabled)
            .gravity_scale(self.gravity_scale)
            .user_data(self.user_data as u128);

        if self.fixed_rotation {
            builder = builder.lock_rotations();
        }
        builder.build()
    }
}

/// 碰撞过滤 (`b2Filter`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterData {
    pub category_bits: u16,
    pub mask_bits: u16,
    pub group_index: i16,
}

impl_default!(FilterData {
    category_bits: 0x0001,
    mask_bits: 0xFFFF,
    group_index: 0,
});

impl FilterData {
    /// Box2D `b2ContactFilter::ShouldCollide`
    pub fn should_collide(&self, other: &FilterData) -> bool {
        if self.group_index == other.group_index && self.group_index != 0 {
            return self.group_index > 0;
        }
        (self.mask_bits & other.category_bits) != 0 && (self.category_bits & other.mask_bits) != 0
    }

    /// 打包进碰撞体的 `user_data`
    pub fn pack(&self) -> u128 {
        (self.category_bits as u128)
            | ((self.mask_bits as u128) << 16)
            | ((self.group_index as u16 as u128) << 32)
    }

    pub fn unpack(bits: u128) -> Self {
        Self {
            category_bits: (bits & 0xFFFF) as u16,
            mask_bits: ((bits >> 16) & 0xFFFF) as u16,
            group_index: ((bits >> 32) & 0xFFFF) as u16 as i16,
        }
    }

    /// 只覆盖提供了的字段
    pub fn apply(&mut self, update: &FilterUpdate) {
        if let Some(bits) = update.category_bits {
            self.category_bits = bits;
        }
        if let Some(bits) = update.mask_bits {
            self.mask_bits = bits;
        }
        if let Some(index) = update.group_index {
            self.group_index = index;
        }
    }
}

/// 部分更新的过滤数据，`None` 表示保持不变
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterUpdate {
    pub category_bits: Option<u16>,
    pub mask_bits: Option<u16>,
    pub group_index: Option<i16>,
}

/// 夹具定义 (`b2FixtureDef`)
#[derive(Debug, Clone)]
pub struct FixtureDefData {
    pub shape: Option<ShapeCell>,
    pub density: Real,
    pub friction: Real,
    pub restitution: Real,
    pub is_sensor: bool,
    pub filter: FilterData,
}

impl_default!(FixtureDefData {
    shape: None,
    density: 0.0,
    friction: 0.2,
    restitution: 0.0,
    is_sensor: false,
    filter: FilterData::default(),
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_pack_roundtrip() {
        let filter = FilterData {
            category_bits: 0x0004,
            mask_bits: 0x00F0,
            group_index: -3,
        };
        assert_eq!(FilterData::unpack(filter.pack()), filter);
        assert_eq!(FilterData::unpack(FilterData::default().pack()), FilterData::default());
    }

    #[test]
    fn test_filter_groups() {
        let a = FilterData { group_index: -1, ..Default::default() };
        let b = FilterData { group_index: -1, ..Default::default() };
        assert!(!a.should_collide(&b));

        let a = FilterData { group_index: 2, mask_bits: 0, ..Default::default() };
        let b = FilterData { group_index: 2, mask_bits: 0, ..Default::default() };
        assert!(a.should_collide(&b));
    }

    #[test]
    fn test_filter_masks() {
        let player = FilterData { category_bits: 0x0002, mask_bits: 0x0001, group_index: 0 };
        let ground = FilterData::default();
        let ghost = FilterData { category_bits: 0x0008, mask_bits: 0x0000, group_index: 0 };
        assert!(player.should_collide(&ground));
        assert!(!player.should_collide(&player));
        assert!(!ghost.should_collide(&ground));
    }

    #[test]
    fn test_filter_partial_update() {
        let mut filter = FilterData::default();
        filter.apply(&FilterUpdate { mask_bits: Some(0x0002), ..Default::default() });
        assert_eq!(filter.category_bits, 0x0001);
        assert_eq!(filter.mask_bits, 0x0002);
        assert_eq!(filter.group_index, 0);
    }

    #[test]
    fn test_body_def_to_rigid_body() {
        let def = BodyDefData {
            body_type: 2,
            position: Vec2::new(1.0, 2.0),
            angle: 0.5,
            fixed_rotation: true,
            user_data: 42,
            ..Default::default()
        };
        let body = def.to_rigid_body();
        assert!(body.is_dynamic());
        assert_eq!(body.translation().x, 1.0);
        assert_eq!(body.translation().y, 2.0);
        assert!((body.rotation().angle() - 0.5).abs() < 1e-6);
        assert!(body.locked_axes().contains(LockedAxes::ROTATION_LOCKED));
        assert_eq!(body.user_data, 42);
    }
}
