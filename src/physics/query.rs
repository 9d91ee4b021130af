//! 射线与 AABB 查询
//!
//! 查询分两步：先在借用状态时收集候选，再释放借用把候选逐个交给回调，
//! 回调里因此可以安全地读取世界。

use glam::Vec2;
use rapier2d::prelude::*;

use super::world::PhysicsState;
use super::{from_point, from_vector, to_point, to_vector};

/// 射线命中 (`ReportFixture` 的参数)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub fixture: ColliderHandle,
    pub point: Vec2,
    pub normal: Vec2,
    /// 沿 p1→p2 的比例，0..=1
    pub fraction: Real,
}

/// 射线回调 (`b2RayCastCallback`)
///
/// 返回值控制后续查询：
/// - `-1` 忽略本次命中
/// - `0` 终止查询
/// - 其它正数把射线裁剪到该比例
pub trait RayCastCallback {
    type Error;

    fn report_fixture(&mut self, hit: &RayHit) -> Result<Real, Self::Error>;
}

/// AABB 查询回调 (`b2QueryCallback`)，返回 `false` 终止查询
pub trait QueryCallback {
    type Error;

    fn report_fixture(&mut self, fixture: ColliderHandle) -> Result<bool, Self::Error>;
}

impl PhysicsState {
    /// 收集线段 p1→p2 命中的所有夹具
    ///
    /// 起点在形状内部的命中 (比例为 0) 会被忽略，与 Box2D 一致。
    pub fn ray_candidates(&mut self, p1: Vec2, p2: Vec2) -> Vec<RayHit> {
        let direction = p2 - p1;
        if direction.length_squared() <= Real::EPSILON {
            return Vec::new();
        }
        self.query_pipeline.update(&self.collider_set);

        let ray = Ray::new(to_point(p1), to_vector(direction));
        let mut hits = Vec::new();
        self.query_pipeline.intersections_with_ray(
            &self.rigid_body_set,
            &self.collider_set,
            &ray,
            1.0,
            true,
            QueryFilter::default(),
            |handle, intersection| {
                if intersection.time_of_impact > 0.0 {
                    hits.push(RayHit {
                        fixture: handle,
                        point: from_point(&ray.point_at(intersection.time_of_impact)),
                        normal: from_vector(&intersection.normal),
                        fraction: intersection.time_of_impact,
                    });
                }
                true
            },
        );
        hits
    }

    /// 收集 AABB 与查询框重叠的所有夹具
    pub fn aabb_candidates(&mut self, lower: Vec2, upper: Vec2) -> Vec<ColliderHandle> {
        self.query_pipeline.update(&self.collider_set);

        let aabb = Aabb::new(to_point(lower.min(upper)), to_point(lower.max(upper)));
        let mut found = Vec::new();
        self.query_pipeline
            .colliders_with_aabb_intersecting_aabb(&aabb, |handle| {
                found.push(*handle);
                true
            });
        found
    }
}

/// 按 Box2D 的裁剪协议把命中交给回调
pub fn run_ray_cast<C: RayCastCallback>(
    hits: Vec<RayHit>,
    callback: &mut C,
) -> Result<(), C::Error> {
    let mut max_fraction: Real = 1.0;
    for hit in hits {
        if hit.fraction > max_fraction {
            continue;
        }
        let value = callback.report_fixture(&hit)?;
        if value == 0.0 {
            break;
        }
        if value > 0.0 {
            max_fraction = value;
        }
    }
    Ok(())
}

/// 逐个报告 AABB 候选，回调返回 `false` 时停止
pub fn run_query<C: QueryCallback>(
    fixtures: Vec<ColliderHandle>,
    callback: &mut C,
) -> Result<(), C::Error> {
    for fixture in fixtures {
        if !callback.report_fixture(fixture)? {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    struct Recorder {
        answers: Vec<Real>,
        seen: Vec<Real>,
    }

    impl RayCastCallback for Recorder {
        type Error = Infallible;

        fn report_fixture(&mut self, hit: &RayHit) -> Result<Real, Infallible> {
            self.seen.push(hit.fraction);
            Ok(if self.answers.is_empty() { 1.0 } else { self.answers.remove(0) })
        }
    }

    fn hit(fraction: Real) -> RayHit {
        RayHit {
            fixture: ColliderHandle::invalid(),
            point: Vec2::ZERO,
            normal: Vec2::Y,
            fraction,
        }
    }

    #[test]
    fn test_ray_cast_clipping() {
        let mut recorder = Recorder { answers: vec![0.5], seen: vec![] };
        run_ray_cast(vec![hit(0.5), hit(0.8), hit(0.2)], &mut recorder).unwrap();
        assert_eq!(recorder.seen, vec![0.5, 0.2]);
    }

    #[test]
    fn test_ray_cast_terminate_and_ignore() {
        let mut recorder = Recorder { answers: vec![-1.0, 0.0], seen: vec![] };
        run_ray_cast(vec![hit(0.3), hit(0.9), hit(0.1)], &mut recorder).unwrap();
        assert_eq!(recorder.seen, vec![0.3, 0.9]);
    }

    struct StopAfter(usize, Vec<ColliderHandle>);

    impl QueryCallback for StopAfter {
        type Error = Infallible;

        fn report_fixture(&mut self, fixture: ColliderHandle) -> Result<bool, Infallible> {
            self.1.push(fixture);
            Ok(self.1.len() < self.0)
        }
    }

    #[test]
    fn test_query_stops_on_false() {
        let mut callback = StopAfter(2, vec![]);
        let handles = vec![ColliderHandle::invalid(); 5];
        run_query(handles, &mut callback).unwrap();
        assert_eq!(callback.1.len(), 2);
    }
}
