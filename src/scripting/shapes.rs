//! 形状包装：`b2PolygonShape`、`b2CircleShape`、`b2EdgeShape`

use glam::Vec2;
use rquickjs::class::Trace;
use rquickjs::function::Opt;
use rquickjs::{Class, Ctx, FromJs, IntoJs, Object, Result, Value};

use super::carriers::SharedDef;
use super::vec2::{number, optional_number, type_error, vec2_from_value, vec2_to_value};
use crate::core::OrThrow;
use crate::physics::shapes::{CircleDef, EdgeDef, PolygonDef};
use crate::physics::{ShapeCell, ShapeDef};

/// `b2PolygonShape`
#[derive(Trace)]
#[rquickjs::class(rename = "b2PolygonShape")]
pub struct PolygonShape {
    shape: SharedDef<ShapeDef>,
}

/// `b2CircleShape`
#[derive(Trace)]
#[rquickjs::class(rename = "b2CircleShape")]
pub struct CircleShape {
    shape: SharedDef<ShapeDef>,
}

/// `b2EdgeShape`
#[derive(Trace)]
#[rquickjs::class(rename = "b2EdgeShape")]
pub struct EdgeShape {
    shape: SharedDef<ShapeDef>,
}

impl PolygonShape {
    pub fn new() -> Self {
        Self { shape: SharedDef::new(ShapeDef::polygon()) }
    }

    fn with_polygon<R>(&self, f: impl FnOnce(&mut PolygonDef) -> R) -> Option<R> {
        self.shape.update(|shape| match shape {
            ShapeDef::Polygon(polygon) => Some(f(polygon)),
            _ => None,
        })
    }
}

impl Default for PolygonShape {
    fn default() -> Self {
        Self::new()
    }
}

#[rquickjs::methods]
impl PolygonShape {
    #[qjs(rename = "SetAsBox")]
    pub fn set_as_box<'js>(
        &self,
        ctx: Ctx<'js>,
        hx: Value<'js>,
        hy: Value<'js>,
        center: Opt<Value<'js>>,
        angle: Opt<Value<'js>>,
    ) -> Result<()> {
        let hx = number(&ctx, &hx, "hx")?;
        let hy = number(&ctx, &hy, "hy")?;
        let center = match center.0 {
            Some(value) if !value.is_undefined() => vec2_from_value(&ctx, &value, "center")?,
            _ => Vec2::ZERO,
        };
        let angle = optional_number(&ctx, angle.0, "angle", 0.0)?;
        self.with_polygon(|polygon| polygon.set_as_box(hx, hy, center, angle));
        Ok(())
    }

    #[qjs(rename = "Set")]
    pub fn set<'js>(&self, ctx: Ctx<'js>, points: Value<'js>) -> Result<()> {
        let Some(array) = points.as_array() else {
            return type_error(&ctx, "Set expects an array of Vec2");
        };
        let mut vertices = Vec::with_capacity(array.len());
        for point in array.iter::<Value>() {
            vertices.push(vec2_from_value(&ctx, &point?, "vertex")?);
        }
        let result = self
            .with_polygon(|polygon| polygon.set_points(vertices))
            .unwrap_or(Ok(()));
        if let Err(err) = &result {
            tracing::warn!(target: "scripting", error = %err, "polygon rejected");
        }
        result.or_throw(&ctx)
    }

    #[qjs(rename = "GetVertexCount")]
    pub fn get_vertex_count(&self) -> usize {
        self.with_polygon(|polygon| polygon.vertex_count()).unwrap_or(0)
    }

    #[qjs(rename = "GetVertex")]
    pub fn get_vertex<'js>(&self, ctx: Ctx<'js>, index: Value<'js>) -> Result<Value<'js>> {
        let index = number(&ctx, &index, "index")?;
        let vertices = self.shape.get().polygon_vertices();
        match vertices.get(index as usize) {
            Some(vertex) if index >= 0.0 => vec2_to_value(&ctx, *vertex)?.into_js(&ctx),
            _ => Ok(Value::new_undefined(ctx)),
        }
    }
}

impl CircleShape {
    pub fn new() -> Self {
        Self { shape: SharedDef::new(ShapeDef::circle()) }
    }

    fn circle(&self) -> CircleDef {
        match &*self.shape.get() {
            ShapeDef::Circle(circle) => circle.clone(),
            _ => CircleDef::default(),
        }
    }

    fn update_circle(&self, f: impl FnOnce(&mut CircleDef)) {
        self.shape.update(|shape| {
            if let ShapeDef::Circle(circle) = shape {
                f(circle);
            }
        });
    }
}

impl Default for CircleShape {
    fn default() -> Self {
        Self::new()
    }
}

#[rquickjs::methods]
impl CircleShape {
    #[qjs(get, rename = "m_radius")]
    pub fn radius_property(&self) -> f64 {
        self.circle().radius as f64
    }

    #[qjs(set, rename = "m_radius")]
    pub fn set_radius_property<'js>(&self, value: Value<'js>) -> Result<()> {
        let radius = number(value.ctx(), &value, "m_radius")?;
        self.update_circle(|circle| circle.radius = radius);
        Ok(())
    }

    #[qjs(get, rename = "m_p")]
    pub fn center<'js>(&self, ctx: Ctx<'js>) -> Result<Object<'js>> {
        vec2_to_value(&ctx, self.circle().center)
    }

    #[qjs(set, rename = "m_p")]
    pub fn set_center<'js>(&self, value: Value<'js>) -> Result<()> {
        let center = vec2_from_value(value.ctx(), &value, "m_p")?;
        self.update_circle(|circle| circle.center = center);
        Ok(())
    }

    #[qjs(rename = "SetRadius")]
    pub fn set_radius<'js>(&self, ctx: Ctx<'js>, radius: Value<'js>) -> Result<()> {
        let radius = number(&ctx, &radius, "radius")?;
        self.update_circle(|circle| circle.radius = radius);
        Ok(())
    }

    #[qjs(rename = "GetRadius")]
    pub fn get_radius(&self) -> f64 {
        self.circle().radius as f64
    }
}

impl EdgeShape {
    pub fn new() -> Self {
        Self { shape: SharedDef::new(ShapeDef::edge()) }
    }
}

impl Default for EdgeShape {
    fn default() -> Self {
        Self::new()
    }
}

#[rquickjs::methods]
impl EdgeShape {
    #[qjs(rename = "SetTwoSided")]
    pub fn set_two_sided<'js>(&self, ctx: Ctx<'js>, v1: Value<'js>, v2: Value<'js>) -> Result<()> {
        let v1 = vec2_from_value(&ctx, &v1, "v1")?;
        let v2 = vec2_from_value(&ctx, &v2, "v2")?;
        self.shape.update(|shape| *shape = ShapeDef::Edge(EdgeDef { vertices: Some((v1, v2)) }));
        Ok(())
    }

    /// 旧版 Box2D 的 `Set(v1, v2)`
    #[qjs(rename = "Set")]
    pub fn set<'js>(&self, ctx: Ctx<'js>, v1: Value<'js>, v2: Value<'js>) -> Result<()> {
        self.set_two_sided(ctx, v1, v2)
    }
}

// ===== 转换 =====

/// 从任意形状宿主对象取出共享形状；不是形状时返回 `None`
pub fn shape_from_value<'js>(ctx: &Ctx<'js>, value: &Value<'js>) -> Option<ShapeCell> {
    if let Ok(polygon) = Class::<PolygonShape>::from_js(ctx, value.clone()) {
        return Some(polygon.borrow().shape.rc());
    }
    if let Ok(circle) = Class::<CircleShape>::from_js(ctx, value.clone()) {
        return Some(circle.borrow().shape.rc());
    }
    if let Ok(edge) = Class::<EdgeShape>::from_js(ctx, value.clone()) {
        return Some(edge.borrow().shape.rc());
    }
    None
}

/// 为共享形状生成对应种类的宿主对象 (与原对象共享同一份数据)
pub fn shape_to_value<'js>(ctx: &Ctx<'js>, cell: ShapeCell) -> Result<Value<'js>> {
    let kind = cell.borrow().kind_name();
    let shape = SharedDef::from_rc(cell);
    match kind {
        "polygon" => Class::instance(ctx.clone(), PolygonShape { shape })?.into_js(ctx),
        "circle" => Class::instance(ctx.clone(), CircleShape { shape })?.into_js(ctx),
        _ => Class::instance(ctx.clone(), EdgeShape { shape })?.into_js(ctx),
    }
}
