//! 刚体与夹具定义包装：`b2BodyDef`、`b2FixtureDef`
//!
//! 每个属性都有 getter/setter；setter 对类型不符的值抛 `TypeError`，不会写入部分数据。

use rquickjs::class::Trace;
use rquickjs::{Ctx, Object, Result, Value};

use super::carriers::SharedDef;
use super::shapes::{shape_from_value, shape_to_value};
use super::vec2::{boolean, number, type_error, vec2_from_value, vec2_to_value};
use crate::physics::{body_type_from_code, BodyDefData, FilterData, FilterUpdate, FixtureDefData};

/// `b2BodyDef`
#[derive(Trace)]
#[rquickjs::class(rename = "b2BodyDef")]
pub struct BodyDef {
    def: SharedDef<BodyDefData>,
}

impl BodyDef {
    pub fn new() -> Self {
        Self { def: SharedDef::new(BodyDefData::default()) }
    }

    /// 当前内容的拷贝
    pub fn data(&self) -> BodyDefData {
        self.def.snapshot()
    }

    fn set_number<'js>(
        &self,
        value: &Value<'js>,
        what: &str,
        apply: impl FnOnce(&mut BodyDefData, f32),
    ) -> Result<()> {
        let n = number(value.ctx(), value, what)?;
        self.def.update(|def| apply(def, n));
        Ok(())
    }

    fn set_bool<'js>(
        &self,
        value: &Value<'js>,
        what: &str,
        apply: impl FnOnce(&mut BodyDefData, bool),
    ) -> Result<()> {
        let b = boolean(value.ctx(), value, what)?;
        self.def.update(|def| apply(def, b));
        Ok(())
    }
}

impl Default for BodyDef {
    fn default() -> Self {
        Self::new()
    }
}

#[rquickjs::methods]
impl BodyDef {
    #[qjs(get, rename = "type")]
    pub fn body_type(&self) -> i32 {
        self.def.get().body_type
    }

    #[qjs(set, rename = "type")]
    pub fn set_body_type<'js>(&self, value: Value<'js>) -> Result<()> {
        let ctx = value.ctx();
        let code = number(ctx, &value, "type")?;
        if code.fract() != 0.0 || body_type_from_code(code as i32).is_none() {
            return type_error(ctx, format!("invalid body type {}", code));
        }
        self.def.update(|def| def.body_type = code as i32);
        Ok(())
    }

    #[qjs(get, rename = "position")]
    pub fn position<'js>(&self, ctx: Ctx<'js>) -> Result<Object<'js>> {
        vec2_to_value(&ctx, self.def.get().position)
    }

    #[qjs(set, rename = "position")]
    pub fn set_position<'js>(&self, value: Value<'js>) -> Result<()> {
        let position = vec2_from_value(value.ctx(), &value, "position")?;
        self.def.update(|def| def.position = position);
        Ok(())
    }

    #[qjs(get, rename = "angle")]
    pub fn angle(&self) -> f64 {
        self.def.get().angle as f64
    }

    #[qjs(set, rename = "angle")]
    pub fn set_angle<'js>(&self, value: Value<'js>) -> Result<()> {
        self.set_number(&value, "angle", |def, n| def.angle = n)
    }

    #[qjs(get, rename = "linearVelocity")]
    pub fn linear_velocity<'js>(&self, ctx: Ctx<'js>) -> Result<Object<'js>> {
        vec2_to_value(&ctx, self.def.get().linear_velocity)
    }

    #[qjs(set, rename = "linearVelocity")]
    pub fn set_linear_velocity<'js>(&self, value: Value<'js>) -> Result<()> {
        let velocity = vec2_from_value(value.ctx(), &value, "linearVelocity")?;
        self.def.update(|def| def.linear_velocity = velocity);
        Ok(())
    }

    #[qjs(get, rename = "angularVelocity")]
    pub fn angular_velocity(&self) -> f64 {
        self.def.get().angular_velocity as f64
    }

    #[qjs(set, rename = "angularVelocity")]
    pub fn set_angular_velocity<'js>(&self, value: Value<'js>) -> Result<()> {
        self.set_number(&value, "angularVelocity", |def, n| def.angular_velocity = n)
    }

    #[qjs(get, rename = "linearDamping")]
    pub fn linear_damping(&self) -> f64 {
        self.def.get().linear_damping as f64
    }

    #[qjs(set, rename = "linearDamping")]
    pub fn set_linear_damping<'js>(&self, value: Value<'js>) -> Result<()> {
        self.set_number(&value, "linearDamping", |def, n| def.linear_damping = n)
    }

    #[qjs(get, rename = "angularDamping")]
    pub fn angular_damping(&self) -> f64 {
        self.def.get().angular_damping as f64
    }

    #[qjs(set, rename = "angularDamping")]
    pub fn set_angular_damping<'js>(&self, value: Value<'js>) -> Result<()> {
        self.set_number(&value, "angularDamping", |def, n| def.angular_damping = n)
    }

    #[qjs(get, rename = "allowSleep")]
    pub fn allow_sleep(&self) -> bool {
        self.def.get().allow_sleep
    }

    #[qjs(set, rename = "allowSleep")]
    pub fn set_allow_sleep<'js>(&self, value: Value<'js>) -> Result<()> {
        self.set_bool(&value, "allowSleep", |def, b| def.allow_sleep = b)
    }

    #[qjs(get, rename = "awake")]
    pub fn awake(&self) -> bool {
        self.def.get().awake
    }

    #[qjs(set, rename = "awake")]
    pub fn set_awake<'js>(&self, value: Value<'js>) -> Result<()> {
        self.set_bool(&value, "awake", |def, b| def.awake = b)
    }

    #[qjs(get, rename = "fixedRotation")]
    pub fn fixed_rotation(&self) -> bool {
        self.def.get().fixed_rotation
    }

    #[qjs(set, rename = "fixedRotation")]
    pub fn set_fixed_rotation<'js>(&self, value: Value<'js>) -> Result<()> {
        self.set_bool(&value, "fixedRotation", |def, b| def.fixed_rotation = b)
    }

    #[qjs(get, rename = "bullet")]
    pub fn bullet(&self) -> bool {
        self.def.get().bullet
    }

    #[qjs(set, rename = "bullet")]
    pub fn set_bullet<'js>(&self, value: Value<'js>) -> Result<()> {
        self.set_bool(&value, "bullet", |def, b| def.bullet = b)
    }

    #[qjs(get, rename = "enabled")]
    pub fn enabled(&self) -> bool {
        self.def.get().enabled
    }

    #[qjs(set, rename = "enabled")]
    pub fn set_enabled<'js>(&self, value: Value<'js>) -> Result<()> {
        self.set_bool(&value, "enabled", |def, b| def.enabled = b)
    }

    #[qjs(get, rename = "gravityScale")]
    pub fn gravity_scale(&self) -> f64 {
        self.def.get().gravity_scale as f64
    }

    #[qjs(set, rename = "gravityScale")]
    pub fn set_gravity_scale<'js>(&self, value: Value<'js>) -> Result<()> {
        self.set_number(&value, "gravityScale", |def, n| def.gravity_scale = n)
    }

    #[qjs(get, rename = "userData")]
    pub fn user_data(&self) -> f64 {
        self.def.get().user_data as f64
    }

    #[qjs(set, rename = "userData")]
    pub fn set_user_data<'js>(&self, value: Value<'js>) -> Result<()> {
        let tag = user_data_tag(value.ctx(), &value)?;
        self.def.update(|def| def.user_data = tag);
        Ok(())
    }
}

/// 用户数据按指针宽度的整数保存；超过 2^53 的值在回读时会丢失精度
pub fn user_data_tag<'js>(ctx: &Ctx<'js>, value: &Value<'js>) -> Result<u64> {
    match value.as_number() {
        Some(n) => Ok(n as u64),
        None => type_error(ctx, "userData must be a number"),
    }
}

// ===== 夹具定义 =====

/// `b2FixtureDef`
#[derive(Trace)]
#[rquickjs::class(rename = "b2FixtureDef")]
pub struct FixtureDef {
    def: SharedDef<FixtureDefData>,
}

impl FixtureDef {
    pub fn new() -> Self {
        Self { def: SharedDef::new(FixtureDefData::default()) }
    }

    pub fn data(&self) -> FixtureDefData {
        self.def.snapshot()
    }

    fn set_number<'js>(
        &self,
        value: &Value<'js>,
        what: &str,
        apply: impl FnOnce(&mut FixtureDefData, f32),
    ) -> Result<()> {
        let n = number(value.ctx(), value, what)?;
        self.def.update(|def| apply(def, n));
        Ok(())
    }
}

impl Default for FixtureDef {
    fn default() -> Self {
        Self::new()
    }
}

#[rquickjs::methods]
impl FixtureDef {
    #[qjs(get, rename = "shape")]
    pub fn shape<'js>(&self, ctx: Ctx<'js>) -> Result<Value<'js>> {
        let shape = self.def.get().shape.clone();
        match shape {
            Some(cell) => shape_to_value(&ctx, cell),
            None => Ok(Value::new_undefined(ctx)),
        }
    }

    #[qjs(set, rename = "shape")]
    pub fn set_shape<'js>(&self, value: Value<'js>) -> Result<()> {
        let ctx = value.ctx();
        let Some(shape) = shape_from_value(ctx, &value) else {
            return type_error(ctx, "shape must be a b2PolygonShape, b2CircleShape or b2EdgeShape");
        };
        self.def.update(|def| def.shape = Some(shape));
        Ok(())
    }

    #[qjs(get, rename = "density")]
    pub fn density(&self) -> f64 {
        self.def.get().density as f64
    }

    #[qjs(set, rename = "density")]
    pub fn set_density<'js>(&self, value: Value<'js>) -> Result<()> {
        self.set_number(&value, "density", |def, n| def.density = n)
    }

    #[qjs(get, rename = "friction")]
    pub fn friction(&self) -> f64 {
        self.def.get().friction as f64
    }

    #[qjs(set, rename = "friction")]
    pub fn set_friction<'js>(&self, value: Value<'js>) -> Result<()> {
        self.set_number(&value, "friction", |def, n| def.friction = n)
    }

    #[qjs(get, rename = "restitution")]
    pub fn restitution(&self) -> f64 {
        self.def.get().restitution as f64
    }

    #[qjs(set, rename = "restitution")]
    pub fn set_restitution<'js>(&self, value: Value<'js>) -> Result<()> {
        self.set_number(&value, "restitution", |def, n| def.restitution = n)
    }

    #[qjs(get, rename = "isSensor")]
    pub fn is_sensor(&self) -> bool {
        self.def.get().is_sensor
    }

    #[qjs(set, rename = "isSensor")]
    pub fn set_is_sensor<'js>(&self, value: Value<'js>) -> Result<()> {
        let sensor = boolean(value.ctx(), &value, "isSensor")?;
        self.def.update(|def| def.is_sensor = sensor);
        Ok(())
    }

    #[qjs(get, rename = "filter")]
    pub fn filter<'js>(&self, ctx: Ctx<'js>) -> Result<Object<'js>> {
        filter_to_value(&ctx, &self.def.get().filter)
    }

    #[qjs(set, rename = "filter")]
    pub fn set_filter<'js>(&self, value: Value<'js>) -> Result<()> {
        let update = filter_from_value(value.ctx(), &value)?;
        self.def.update(|def| def.filter.apply(&update));
        Ok(())
    }
}

// ===== 过滤数据 =====

/// `{categoryBits, maskBits, groupIndex}`
pub fn filter_to_value<'js>(ctx: &Ctx<'js>, filter: &FilterData) -> Result<Object<'js>> {
    let object = Object::new(ctx.clone())?;
    object.set("categoryBits", filter.category_bits as i32)?;
    object.set("maskBits", filter.mask_bits as i32)?;
    object.set("groupIndex", filter.group_index as i32)?;
    Ok(object)
}

/// 读取部分过滤数据，缺省字段保持不变
pub fn filter_from_value<'js>(ctx: &Ctx<'js>, value: &Value<'js>) -> Result<FilterUpdate> {
    let Some(object) = value.as_object() else {
        return type_error(ctx, "filter must be an object");
    };
    let field = |name: &str| -> Result<Option<f64>> {
        let value: Value = object.get(name)?;
        if value.is_undefined() {
            return Ok(None);
        }
        match value.as_number() {
            Some(n) => Ok(Some(n)),
            None => type_error(ctx, format!("filter.{} must be a number", name)),
        }
    };
    Ok(FilterUpdate {
        category_bits: field("categoryBits")?.map(|n| n as i64 as u16),
        mask_bits: field("maskBits")?.map(|n| n as i64 as u16),
        group_index: field("groupIndex")?.map(|n| n as i64 as i16),
    })
}
