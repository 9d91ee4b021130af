//! 物理桥接性能基准测试
//!
//! 对比直接驱动 `PhysicsState` 与通过脚本驱动 `b2World.Step` 的开销

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec2;
use physics2d_bridge::config::SimulationConfig;
use physics2d_bridge::physics::shapes::{CircleDef, PolygonDef};
use physics2d_bridge::physics::{BodyDefData, FixtureDefData, PhysicsState, ShapeDef};
use physics2d_bridge::{BridgeConfig, ScriptingRuntime};

fn build_pile(count: usize) -> PhysicsState {
    let mut state = PhysicsState::new(Vec2::new(0.0, -10.0), &SimulationConfig::default());

    let mut ground_shape = PolygonDef::Empty;
    ground_shape.set_as_box(50.0, 0.5, Vec2::ZERO, 0.0);
    let ground = state.create_body(&BodyDefData::default()).expect("ground");
    state
        .create_fixture(
            ground,
            &FixtureDefData {
                shape: Some(ShapeDef::Polygon(ground_shape).into_cell()),
                ..Default::default()
            },
        )
        .expect("ground fixture");

    for i in 0..count {
        let def = BodyDefData {
            body_type: 2,
            position: Vec2::new((i % 20) as f32 - 10.0, 1.0 + (i / 20) as f32 * 1.1),
            ..Default::default()
        };
        let body = state.create_body(&def).expect("body");
        let circle = CircleDef { radius: 0.5, center: Vec2::ZERO };
        state
            .create_fixture(
                body,
                &FixtureDefData {
                    shape: Some(ShapeDef::Circle(circle).into_cell()),
                    density: 1.0,
                    ..Default::default()
                },
            )
            .expect("fixture");
    }
    state
}

fn bench_direct_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("direct_step");

    for count in [10, 100, 500] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let mut state = build_pile(count);
            b.iter(|| black_box(state.step(1.0 / 60.0, 8, 3).expect("step")));
        });
    }

    group.finish();
}

fn bench_scripted_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("scripted_step");

    for count in [10, 100, 500] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let runtime = ScriptingRuntime::new(&BridgeConfig::default()).expect("runtime");
            runtime
                .run(&format!(
                    r#"
                    const B = Box2d;
                    globalThis.world = B.b2World(B.b2Vec2(0, -10));
                    const ground = world.CreateBody(B.b2BodyDef());
                    const box = B.b2PolygonShape();
                    box.SetAsBox(50, 0.5);
                    ground.CreateFixture(box, 0);

                    globalThis.begins = 0;
                    const listener = B.JSContactListener();
                    listener.BeginContact = function () {{ begins++; }};
                    world.SetContactListener(listener);

                    const circle = B.b2CircleShape();
                    circle.m_radius = 0.5;
                    const def = B.b2BodyDef();
                    def.type = B.b2_dynamicBody;
                    for (let i = 0; i < {count}; i++) {{
                        def.position = B.b2Vec2((i % 20) - 10, 1 + Math.floor(i / 20) * 1.1);
                        world.CreateBody(def).CreateFixture(circle, 1);
                    }}
                    "#
                ))
                .expect("scene");
            b.iter(|| runtime.run("world.Step(1 / 60, 8, 3);").expect("step"));
        });
    }

    group.finish();
}

fn bench_ray_cast(c: &mut Criterion) {
    let mut state = build_pile(200);
    for _ in 0..30 {
        state.step(1.0 / 60.0, 8, 3).expect("step");
    }

    c.bench_function("ray_candidates", |b| {
        b.iter(|| {
            black_box(state.ray_candidates(Vec2::new(-20.0, 2.0), Vec2::new(20.0, 2.0)))
        });
    });
}

criterion_group!(benches, bench_direct_step, bench_scripted_step, bench_ray_cast);
criterion_main!(benches);
