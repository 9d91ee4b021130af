//! 形状定义
//!
//! 脚本侧的形状对象共享同一个 [`ShapeCell`]；创建夹具时把当前内容转换成 Rapier 的
//! `SharedShape`，之后对形状对象的修改不会影响已创建的夹具。

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use rapier2d::prelude::*;

use super::to_point;
use crate::core::{BridgeError, BridgeResult};

/// Box2D `b2_maxPolygonVertices`
pub const MAX_POLYGON_VERTICES: usize = 8;

/// 共享的形状定义
pub type ShapeCell = Rc<RefCell<ShapeDef>>;

/// 形状定义
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeDef {
    Polygon(PolygonDef),
    Circle(CircleDef),
    Edge(EdgeDef),
}

/// 多边形 (`b2PolygonShape`)
#[derive(Debug, Clone, PartialEq)]
pub enum PolygonDef {
    /// 尚未设置顶点
    Empty,
    /// `SetAsBox`
    Box {
        half_extents: Vec2,
        center: Vec2,
        angle: Real,
    },
    /// `Set(points)`，保存的是调用方给出的点
    Hull(Vec<Vec2>),
}

/// 圆 (`b2CircleShape`)
#[derive(Debug, Clone, PartialEq)]
pub struct CircleDef {
    pub radius: Real,
    /// 局部圆心 `m_p`
    pub center: Vec2,
}

impl Default for CircleDef {
    fn default() -> Self {
        Self { radius: 0.0, center: Vec2::ZERO }
    }
}

/// 线段 (`b2EdgeShape`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeDef {
    pub vertices: Option<(Vec2, Vec2)>,
}

impl PolygonDef {
    /// 设置为轴对齐或带旋转的盒子
    pub fn set_as_box(&mut self, hx: Real, hy: Real, center: Vec2, angle: Real) {
        *self = PolygonDef::Box {
            half_extents: Vec2::new(hx, hy),
            center,
            angle,
        };
    }

    /// 设置为凸包
    pub fn set_points(&mut self, points: Vec<Vec2>) -> BridgeResult<()> {
        if points.len() < 3 || points.len() > MAX_POLYGON_VERTICES {
            return Err(BridgeError::InvalidShape(format!(
                "polygon needs 3..={} points, got {}",
                MAX_POLYGON_VERTICES,
                points.len()
            )));
        }
        let hull: Vec<Point<Real>> = points.iter().map(|p| to_point(*p)).collect();
        if SharedShape::convex_hull(&hull).is_none() {
            return Err(BridgeError::InvalidShape("polygon points are degenerate".into()));
        }
        *self = PolygonDef::Hull(points);
        Ok(())
    }

    /// 顶点数
    pub fn vertex_count(&self) -> usize {
        match self {
            PolygonDef::Empty => 0,
            PolygonDef::Box { .. } => 4,
            PolygonDef::Hull(points) => points.len(),
        }
    }

    /// 盒子四个角点 (局部坐标)
    fn box_corners(half_extents: Vec2, center: Vec2, angle: Real) -> Vec<Vec2> {
        let rotation = Vec2::from_angle(angle);
        [
            Vec2::new(-half_extents.x, -half_extents.y),
            Vec2::new(half_extents.x, -half_extents.y),
            Vec2::new(half_extents.x, half_extents.y),
            Vec2::new(-half_extents.x, half_extents.y),
        ]
        .iter()
        .map(|corner| center + rotation.rotate(*corner))
        .collect()
    }
}

impl ShapeDef {
    pub fn polygon() -> Self {
        ShapeDef::Polygon(PolygonDef::Empty)
    }

    pub fn circle() -> Self {
        ShapeDef::Circle(CircleDef::default())
    }

    pub fn edge() -> Self {
        ShapeDef::Edge(EdgeDef::default())
    }

    pub fn into_cell(self) -> ShapeCell {
        Rc::new(RefCell::new(self))
    }

    /// 形状名，用于日志和错误信息
    pub fn kind_name(&self) -> &'static str {
        match self {
            ShapeDef::Polygon(_) => "polygon",
            ShapeDef::Circle(_) => "circle",
            ShapeDef::Edge(_) => "edge",
        }
    }

    /// 转换为 Rapier 形状以及相对刚体的局部位姿
    pub fn to_collider_shape(&self) -> BridgeResult<(SharedShape, Isometry<Real>)> {
        match self {
            ShapeDef::Polygon(PolygonDef::Empty) => {
                Err(BridgeError::InvalidShape("polygon has no vertices".into()))
            }
            ShapeDef::Polygon(PolygonDef::Box { half_extents, center, angle }) => {
                if half_extents.x <= 0.0 || half_extents.y <= 0.0 {
                    return Err(BridgeError::InvalidShape(format!(
                        "box half extents must be positive, got ({}, {})",
                        half_extents.x, half_extents.y
                    )));
                }
                Ok((
                    SharedShape::cuboid(half_extents.x, half_extents.y),
                    Isometry::new(vector![center.x, center.y], *angle),
                ))
            }
            ShapeDef::Polygon(PolygonDef::Hull(points)) => {
                let hull: Vec<Point<Real>> = points.iter().map(|p| to_point(*p)).collect();
                SharedShape::convex_hull(&hull)
                    .map(|shape| (shape, Isometry::identity()))
                    .ok_or_else(|| BridgeError::InvalidShape("polygon points are degenerate".into()))
            }
            ShapeDef::Circle(circle) => {
                if circle.radius <= 0.0 {
                    return Err(BridgeError::InvalidShape(format!(
                        "circle radius must be positive, got {}",
                        circle.radius
                    )));
                }
                Ok((
                    SharedShape::ball(circle.radius),
                    Isometry::translation(circle.center.x, circle.center.y),
                ))
            }
            ShapeDef::Edge(EdgeDef { vertices: Some((v1, v2)) }) => {
                Ok((SharedShape::segment(to_point(*v1), to_point(*v2)), Isometry::identity()))
            }
            ShapeDef::Edge(EdgeDef { vertices: None }) => {
                Err(BridgeError::InvalidShape("edge has no vertices".into()))
            }
        }
    }

    /// 局部坐标下的多边形顶点 (`b2PolygonShape::m_vertices`)
    pub fn polygon_vertices(&self) -> Vec<Vec2> {
        match self {
            ShapeDef::Polygon(PolygonDef::Box { half_extents, center, angle }) => {
                PolygonDef::box_corners(*half_extents, *center, *angle)
            }
            ShapeDef::Polygon(PolygonDef::Hull(points)) => points.clone(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_shape() {
        let mut polygon = PolygonDef::Empty;
        polygon.set_as_box(2.0, 0.5, Vec2::ZERO, 0.0);
        let shape = ShapeDef::Polygon(polygon);
        let (shared, local) = shape.to_collider_shape().unwrap();
        let cuboid = shared.as_cuboid().unwrap();
        assert_eq!(cuboid.half_extents.x, 2.0);
        assert_eq!(cuboid.half_extents.y, 0.5);
        assert_eq!(local.translation.vector.x, 0.0);
        assert_eq!(shape.polygon_vertices().len(), 4);
    }

    #[test]
    fn test_empty_polygon_is_rejected() {
        assert!(ShapeDef::polygon().to_collider_shape().is_err());
    }

    #[test]
    fn test_hull_validation() {
        let mut polygon = PolygonDef::Empty;
        assert!(polygon.set_points(vec![Vec2::ZERO, Vec2::X]).is_err());
        assert!(polygon
            .set_points(vec![Vec2::ZERO, Vec2::X, Vec2::new(2.0, 0.0)])
            .is_err());
        assert!(polygon
            .set_points(vec![Vec2::ZERO, Vec2::X, Vec2::new(0.0, 1.0)])
            .is_ok());
        assert_eq!(polygon.vertex_count(), 3);
    }

    #[test]
    fn test_circle_offset() {
        let shape = ShapeDef::Circle(CircleDef { radius: 0.5, center: Vec2::new(1.0, 0.0) });
        let (shared, local) = shape.to_collider_shape().unwrap();
        assert_eq!(shared.as_ball().unwrap().radius, 0.5);
        assert_eq!(local.translation.vector.x, 1.0);
    }

    #[test]
    fn test_edge_shape() {
        let shape = ShapeDef::Edge(EdgeDef {
            vertices: Some((Vec2::new(-10.0, 0.0), Vec2::new(10.0, 0.0))),
        });
        let (shared, _) = shape.to_collider_shape().unwrap();
        assert!(shared.as_segment().is_some());
        assert!(ShapeDef::edge().to_collider_shape().is_err());
    }
}
