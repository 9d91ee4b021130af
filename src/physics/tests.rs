use std::convert::Infallible;

use glam::Vec2;
use rapier2d::prelude::*;

use super::*;
use crate::config::SimulationConfig;

fn world(gravity: Vec2) -> PhysicsState {
    PhysicsState::new(gravity, &SimulationConfig::default())
}

fn box_fixture(hx: f32, hy: f32, density: f32) -> FixtureDefData {
    let mut polygon = shapes::PolygonDef::Empty;
    polygon.set_as_box(hx, hy, Vec2::ZERO, 0.0);
    FixtureDefData {
        shape: Some(ShapeDef::Polygon(polygon).into_cell()),
        density,
        ..Default::default()
    }
}

fn circle_fixture(radius: f32, restitution: f32) -> FixtureDefData {
    FixtureDefData {
        shape: Some(
            ShapeDef::Circle(shapes::CircleDef { radius, center: Vec2::ZERO }).into_cell(),
        ),
        density: 1.0,
        restitution,
        ..Default::default()
    }
}

fn dynamic_at(x: f32, y: f32) -> BodyDefData {
    BodyDefData {
        body_type: 2,
        position: Vec2::new(x, y),
        ..Default::default()
    }
}

#[derive(Default)]
struct EventLog {
    events: Vec<(ContactEventKind, ColliderHandle, ColliderHandle)>,
}

impl ContactListener for EventLog {
    type Error = Infallible;

    fn wants(&self, _event: ContactEventKind) -> bool {
        true
    }

    fn begin_contact(&mut self, contact: ContactSnapshot) -> Result<(), Infallible> {
        self.events.push((ContactEventKind::Begin, contact.fixture_a, contact.fixture_b));
        Ok(())
    }

    fn end_contact(&mut self, contact: ContactSnapshot) -> Result<(), Infallible> {
        self.events.push((ContactEventKind::End, contact.fixture_a, contact.fixture_b));
        Ok(())
    }

    fn pre_solve(&mut self, contact: ContactSnapshot) -> Result<(), Infallible> {
        self.events.push((ContactEventKind::PreSolve, contact.fixture_a, contact.fixture_b));
        Ok(())
    }

    fn post_solve(
        &mut self,
        contact: ContactSnapshot,
        _impulse: ContactImpulse,
    ) -> Result<(), Infallible> {
        self.events.push((ContactEventKind::PostSolve, contact.fixture_a, contact.fixture_b));
        Ok(())
    }
}

#[test]
fn test_free_fall() {
    let mut state = world(Vec2::new(0.0, -10.0));
    let body = state.create_body(&dynamic_at(0.0, 10.0)).unwrap();
    state.create_fixture(body, &box_fixture(0.5, 0.5, 1.0)).unwrap();

    for _ in 0..60 {
        state.step(1.0 / 60.0, 8, 3).unwrap();
    }
    let y = state.rigid_body_set[body].translation().y;
    assert!(y < 6.0 && y > 4.0, "unexpected height {}", y);
}

#[test]
fn test_bodies_without_fixtures_get_unit_mass() {
    let mut state = world(Vec2::new(0.0, -10.0));
    let body = state.create_body(&dynamic_at(0.0, 0.0)).unwrap();
    assert!((state.rigid_body_set[body].mass() - 1.0).abs() < 1e-5);

    state.create_fixture(body, &box_fixture(1.0, 1.0, 2.0)).unwrap();
    assert!((state.rigid_body_set[body].mass() - 8.0).abs() < 1e-3);
}

#[test]
fn test_forces_are_cleared_after_step() {
    let mut state = world(Vec2::ZERO);
    let body = state.create_body(&dynamic_at(0.0, 0.0)).unwrap();
    state.create_fixture(body, &box_fixture(0.5, 0.5, 1.0)).unwrap();
    state.rigid_body_set[body].add_force(vector![10.0, 0.0], true);

    state.step(1.0 / 60.0, 8, 3).unwrap();
    let after_push = state.rigid_body_set[body].linvel().x;
    state.step(1.0 / 60.0, 8, 3).unwrap();
    let after_coast = state.rigid_body_set[body].linvel().x;

    assert!(after_push > 0.0);
    assert!((after_coast - after_push).abs() < 1e-5);
    assert_eq!(state.rigid_body_set[body].user_force(), vector![0.0, 0.0]);
}

#[test]
fn test_solver_iterations_are_clamped() {
    let mut state = world(Vec2::new(0.0, -10.0));
    let body = state.create_body(&dynamic_at(0.0, 0.0)).unwrap();
    state.create_fixture(body, &box_fixture(0.5, 0.5, 1.0)).unwrap();

    state.step(1.0 / 60.0, usize::MAX, 3).unwrap();
    assert_eq!(
        state.integration_parameters.num_solver_iterations.get(),
        MAX_SOLVER_ITERATIONS
    );
    state.step(1.0 / 60.0, 0, 3).unwrap();
    assert_eq!(state.integration_parameters.num_solver_iterations.get(), 1);
}

#[test]
fn test_destroy_body_removes_fixtures_and_joints() {
    let mut state = world(Vec2::ZERO);
    let a = state.create_body(&dynamic_at(0.0, 0.0)).unwrap();
    let b = state.create_body(&dynamic_at(2.0, 0.0)).unwrap();
    let fixture = state.create_fixture(a, &box_fixture(0.5, 0.5, 1.0)).unwrap();
    let spec = JointSpec::Weld(
        JointBase { body_a: a, body_b: b, collide_connected: false },
        WeldSpec {
            local_anchor_a: Vec2::ZERO,
            local_anchor_b: Vec2::ZERO,
            reference_angle: 0.0,
        },
    );
    let joint = state.create_joint(&spec).unwrap();
    assert_eq!(state.joint_count(), 1);

    state.destroy_body(a).unwrap();
    assert!(state.collider_set.get(fixture).is_none());
    assert!(state.joint_record(joint).is_err());
    assert_eq!(state.joint_count(), 0);
    assert_eq!(state.body_count(), 1);
    assert!(state.destroy_body(a).is_err());
}

#[test]
fn test_locked_world_rejects_mutation() {
    let shared = world(Vec2::ZERO).into_shared();
    {
        let _lock = WorldLock::acquire(&shared).unwrap();
        let mut state = shared.borrow_mut();
        assert!(state.is_locked());
        assert_eq!(
            state.create_body(&BodyDefData::default()),
            Err(crate::core::BridgeError::WorldLocked)
        );
        assert!(state.step(1.0 / 60.0, 8, 3).is_err());
        drop(state);
        assert!(WorldLock::acquire(&shared).is_err());
    }
    assert!(!shared.borrow().is_locked());
    assert!(shared.borrow_mut().create_body(&BodyDefData::default()).is_ok());
}

#[test]
fn test_contact_events_are_ordered() {
    let shared = world(Vec2::new(0.0, -10.0)).into_shared();
    let ground_fixture;
    {
        let mut state = shared.borrow_mut();
        let ground = state.create_body(&BodyDefData::default()).unwrap();
        ground_fixture = state.create_fixture(ground, &box_fixture(10.0, 0.5, 0.0)).unwrap();
        let ball = state.create_body(&dynamic_at(0.0, 1.6)).unwrap();
        state.create_fixture(ball, &circle_fixture(0.5, 0.0)).unwrap();
    }

    let mut log = EventLog::default();
    for _ in 0..120 {
        let report = shared.borrow_mut().step(1.0 / 60.0, 8, 3).unwrap();
        dispatch_contact_events(&shared, &report, &mut log).unwrap();
    }

    let first_begin = log
        .events
        .iter()
        .position(|(kind, _, _)| *kind == ContactEventKind::Begin)
        .expect("ball should land");
    let first_pre = log
        .events
        .iter()
        .position(|(kind, _, _)| *kind == ContactEventKind::PreSolve)
        .expect("resting contact is solved");
    assert!(first_begin < first_pre);
    assert!(log
        .events
        .iter()
        .all(|(_, a, b)| *a == ground_fixture || *b == ground_fixture));
}

#[test]
fn test_filter_group_prevents_contact() {
    let shared = world(Vec2::new(0.0, -10.0)).into_shared();
    {
        let mut state = shared.borrow_mut();
        let ground = state.create_body(&BodyDefData::default()).unwrap();
        let mut ground_def = box_fixture(10.0, 0.5, 0.0);
        ground_def.filter.group_index = -1;
        state.create_fixture(ground, &ground_def).unwrap();

        let ball = state.create_body(&dynamic_at(0.0, 2.0)).unwrap();
        let mut ball_def = circle_fixture(0.5, 0.0);
        ball_def.filter.group_index = -1;
        state.create_fixture(ball, &ball_def).unwrap();
    }

    let mut log = EventLog::default();
    for _ in 0..60 {
        let report = shared.borrow_mut().step(1.0 / 60.0, 8, 3).unwrap();
        dispatch_contact_events(&shared, &report, &mut log).unwrap();
    }
    assert!(log.events.is_empty());
}

#[test]
fn test_touching_contacts_before_destroy() {
    let shared = world(Vec2::new(0.0, -10.0)).into_shared();
    let ball;
    {
        let mut state = shared.borrow_mut();
        let ground = state.create_body(&BodyDefData::default()).unwrap();
        state.create_fixture(ground, &box_fixture(10.0, 0.5, 0.0)).unwrap();
        ball = state.create_body(&dynamic_at(0.0, 1.0)).unwrap();
        state.create_fixture(ball, &circle_fixture(0.5, 0.0)).unwrap();
    }
    for _ in 0..30 {
        shared.borrow_mut().step(1.0 / 60.0, 8, 3).unwrap();
    }

    let state = shared.borrow();
    let fixtures = state.body_fixtures(ball).unwrap();
    let contacts = state.touching_contacts(&fixtures);
    assert_eq!(contacts.len(), 1);
    assert!(contacts[0].touching);
}

#[test]
fn test_solver_friction_matches_snapshot() {
    let shared = world(Vec2::new(0.0, -10.0)).into_shared();
    let (ground_fixture, ball_fixture);
    {
        let mut state = shared.borrow_mut();
        let ground = state.create_body(&BodyDefData::default()).unwrap();
        let mut ground_def = box_fixture(10.0, 0.5, 0.0);
        ground_def.friction = 0.2;
        ground_fixture = state.create_fixture(ground, &ground_def).unwrap();

        let ball = state.create_body(&dynamic_at(0.0, 1.0)).unwrap();
        let mut ball_def = circle_fixture(0.5, 0.0);
        ball_def.friction = 0.0;
        ball_fixture = state.create_fixture(ball, &ball_def).unwrap();
    }
    for _ in 0..10 {
        shared.borrow_mut().step(1.0 / 60.0, 8, 3).unwrap();
    }

    let state = shared.borrow();
    let pair = state
        .narrow_phase
        .contact_pair(ground_fixture, ball_fixture)
        .expect("ball rests on the ground");
    let solver_contacts: Vec<_> = pair
        .manifolds
        .iter()
        .flat_map(|manifold| manifold.data.solver_contacts.iter())
        .collect();
    assert!(!solver_contacts.is_empty());
    assert!(solver_contacts.iter().all(|contact| contact.friction == 0.0));

    let snapshot = ContactSnapshot::capture(&state, ground_fixture, ball_fixture, true);
    assert_eq!(snapshot.friction, 0.0);
}

#[test]
fn test_frictionless_box_keeps_sliding() {
    let mut state = world(Vec2::new(0.0, -10.0));
    let ground = state.create_body(&BodyDefData::default()).unwrap();
    let mut ground_def = box_fixture(50.0, 0.5, 0.0);
    ground_def.friction = 0.2;
    state.create_fixture(ground, &ground_def).unwrap();

    let slider = state.create_body(&dynamic_at(0.0, 1.0)).unwrap();
    let mut slider_def = box_fixture(0.5, 0.5, 1.0);
    slider_def.friction = 0.0;
    state.create_fixture(slider, &slider_def).unwrap();
    state.rigid_body_set[slider].set_linvel(vector![2.0, 0.0], true);

    for _ in 0..60 {
        state.step(1.0 / 60.0, 8, 3).unwrap();
    }
    let vx = state.rigid_body_set[slider].linvel().x;
    assert!((vx - 2.0).abs() < 1e-2, "friction slowed the box to {}", vx);
}

#[test]
fn test_destroyed_fixture_ends_contact_on_next_step() {
    let shared = world(Vec2::new(0.0, -10.0)).into_shared();
    let (ground_fixture, ball_fixture);
    {
        let mut state = shared.borrow_mut();
        let ground = state.create_body(&BodyDefData::default()).unwrap();
        ground_fixture = state.create_fixture(ground, &box_fixture(10.0, 0.5, 0.0)).unwrap();
        let ball = state.create_body(&dynamic_at(0.0, 1.0)).unwrap();
        ball_fixture = state.create_fixture(ball, &circle_fixture(0.5, 0.0)).unwrap();
    }

    let mut log = EventLog::default();
    for _ in 0..10 {
        let report = shared.borrow_mut().step(1.0 / 60.0, 8, 3).unwrap();
        dispatch_contact_events(&shared, &report, &mut log).unwrap();
    }
    let begins = log
        .events
        .iter()
        .filter(|(kind, _, _)| *kind == ContactEventKind::Begin)
        .count();
    assert!(begins >= 1);

    shared.borrow_mut().destroy_fixture(ball_fixture).unwrap();
    log.events.clear();
    let report = shared.borrow_mut().step(1.0 / 60.0, 8, 3).unwrap();
    assert_eq!(report.ended_contacts.len(), 1);
    dispatch_contact_events(&shared, &report, &mut log).unwrap();

    assert_eq!(log.events.len(), 1);
    let (kind, a, b) = log.events[0];
    assert_eq!(kind, ContactEventKind::End);
    assert!(a == ball_fixture || b == ball_fixture);
    assert!(a == ground_fixture || b == ground_fixture);

    let report = shared.borrow_mut().step(1.0 / 60.0, 8, 3).unwrap();
    assert!(report.ended_contacts.is_empty());
}

#[test]
fn test_ray_candidates_hit_circle() {
    let mut state = world(Vec2::ZERO);
    let body = state
        .create_body(&BodyDefData { position: Vec2::new(5.0, 0.0), ..Default::default() })
        .unwrap();
    let fixture = state.create_fixture(body, &circle_fixture(1.0, 0.0)).unwrap();

    let hits = state.ray_candidates(Vec2::ZERO, Vec2::new(10.0, 0.0));
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].fixture, fixture);
    assert!((hits[0].fraction - 0.4).abs() < 1e-4);
    assert!((hits[0].point.x - 4.0).abs() < 1e-4);
    assert!((hits[0].normal.x + 1.0).abs() < 1e-4);

    assert!(state.ray_candidates(Vec2::ZERO, Vec2::ZERO).is_empty());
}

#[test]
fn test_aabb_candidates() {
    let mut state = world(Vec2::ZERO);
    let near = state
        .create_body(&BodyDefData { position: Vec2::new(1.0, 1.0), ..Default::default() })
        .unwrap();
    let near_fixture = state.create_fixture(near, &circle_fixture(0.5, 0.0)).unwrap();
    let far = state
        .create_body(&BodyDefData { position: Vec2::new(5.0, 5.0), ..Default::default() })
        .unwrap();
    state.create_fixture(far, &circle_fixture(0.5, 0.0)).unwrap();

    let found = state.aabb_candidates(Vec2::ZERO, Vec2::new(2.0, 2.0));
    assert_eq!(found, vec![near_fixture]);
}

#[test]
fn test_revolute_motor_updates() {
    let mut state = world(Vec2::ZERO);
    let ground = state.create_body(&BodyDefData::default()).unwrap();
    let wheel = state.create_body(&dynamic_at(0.0, 0.0)).unwrap();
    state.create_fixture(wheel, &circle_fixture(0.5, 0.0)).unwrap();
    let spec = JointSpec::Revolute(
        JointBase { body_a: ground, body_b: wheel, collide_connected: false },
        RevoluteSpec {
            local_anchor_a: Vec2::ZERO,
            local_anchor_b: Vec2::ZERO,
            reference_angle: 0.0,
            enable_limit: false,
            lower_angle: 0.0,
            upper_angle: 0.0,
            motor: MotorState::default(),
        },
    );
    let joint = state.create_joint(&spec).unwrap();
    state.enable_motor(joint, true).unwrap();
    state.set_max_motor_torque(joint, 1000.0).unwrap();
    state.set_motor_speed(joint, 2.0).unwrap();
    assert!(state.is_motor_enabled(joint).unwrap());
    assert_eq!(state.motor_speed(joint).unwrap(), 2.0);

    for _ in 0..60 {
        state.step(1.0 / 60.0, 8, 3).unwrap();
    }
    let spin = state.rigid_body_set[wheel].angvel();
    assert!(spin > 1.0, "wheel should spin, got {}", spin);
}

#[cfg(test)]
mod property_tests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn filter_data_survives_user_data(
            category in any::<u16>(),
            mask in any::<u16>(),
            group in any::<i16>()
        ) {
            let filter = FilterData { category_bits: category, mask_bits: mask, group_index: group };
            prop_assert_eq!(FilterData::unpack(filter.pack()), filter);
        }

        #[test]
        fn should_collide_is_symmetric(
            a in (any::<u16>(), any::<u16>(), -2i16..3),
            b in (any::<u16>(), any::<u16>(), -2i16..3)
        ) {
            let fa = FilterData { category_bits: a.0, mask_bits: a.1, group_index: a.2 };
            let fb = FilterData { category_bits: b.0, mask_bits: b.1, group_index: b.2 };
            prop_assert_eq!(fa.should_collide(&fb), fb.should_collide(&fa));
        }

        #[test]
        fn body_position_always_valid(
            x in -1000.0f32..1000.0,
            y in -1000.0f32..1000.0
        ) {
            let mut state = world(Vec2::new(0.0, -10.0));
            let body = state.create_body(&dynamic_at(x, y)).unwrap();
            state.step(1.0 / 60.0, 8, 3).unwrap();
            let position = state.rigid_body_set[body].translation();
            prop_assert!(position.x.is_finite() && position.y.is_finite());
            prop_assert!((position.x - x).abs() < 1e-3);
        }

        #[test]
        fn definitions_are_reusable(count in 1usize..8) {
            let mut state = world(Vec2::ZERO);
            let def = dynamic_at(1.0, 2.0);
            let fixture = box_fixture(0.5, 0.5, 1.0);
            for _ in 0..count {
                let body = state.create_body(&def).unwrap();
                state.create_fixture(body, &fixture).unwrap();
            }
            prop_assert_eq!(state.body_count(), count);
            prop_assert_eq!(state.collider_set.len(), count);
        }
    }
}
