use approx::assert_relative_eq;
use gcs_solver::*;

// ── Helpers ─────────────────────────────────────────────────────────────────

const ALGORITHMS: [Algorithm; 3] = [
    Algorithm::Bfgs,
    Algorithm::LevenbergMarquardt,
    Algorithm::DogLeg,
];

fn distance(sys: &System, a: &Point, b: &Point) -> f64 {
    let (ax, ay) = sys.point(a);
    let (bx, by) = sys.point(b);
    ((bx - ax).powi(2) + (by - ay).powi(2)).sqrt()
}

fn direction(sys: &System, l: &Line) -> (f64, f64) {
    let (x1, y1) = sys.point(&l.p1);
    let (x2, y2) = sys.point(&l.p2);
    (x2 - x1, y2 - y1)
}

fn snapshot(sys: &System) -> Vec<f64> {
    sys.params().iter().map(|(_, p)| p.value).collect()
}

/// Four corners of a slightly skewed rectangle and the four walls between
/// them, corner i to corner i + 1.
fn near_rectangle(sys: &mut System) -> ([Point; 4], [Line; 4]) {
    let corners = [
        sys.add_point(100.0, 102.0),
        sys.add_point(298.0, 98.0),
        sys.add_point(302.0, 197.0),
        sys.add_point(99.0, 203.0),
    ];
    let walls = [0, 1, 2, 3].map(|i| Line::new(corners[i], corners[(i + 1) % 4]));
    (corners, walls)
}

// ── Scenarios ───────────────────────────────────────────────────────────────

#[test]
fn distance_five_with_every_algorithm() {
    for algorithm in ALGORITHMS {
        let mut sys = System::with_parameters(SolverParameters::with_algorithm(algorithm));
        let p1 = sys.add_point(0.0, 0.0);
        let p2 = sys.add_point(3.0, 4.0);
        sys.add_constraint(Constraint::p2p_distance(p1, p2, 5.0))
            .unwrap();
        assert_eq!(sys.solve(), SolveStatus::Success, "{algorithm:?}");
        assert!((distance(&sys, &p1, &p2) - 5.0).abs() < 1e-9);
    }
}

#[test]
fn distance_from_a_rough_start() {
    for algorithm in ALGORITHMS {
        let mut sys = System::with_parameters(SolverParameters::with_algorithm(algorithm));
        let p1 = sys.add_point(1.0, -2.0);
        let p2 = sys.add_point(2.5, 1.0);
        sys.add_constraint(Constraint::p2p_distance(p1, p2, 10.0))
            .unwrap();
        assert_eq!(sys.solve(), SolveStatus::Success, "{algorithm:?}");
        assert!((distance(&sys, &p1, &p2) - 10.0).abs() < 1e-9);
    }
}

#[test]
fn near_rectangle_becomes_axis_aligned() {
    for algorithm in ALGORITHMS {
        let mut sys = System::with_parameters(SolverParameters::with_algorithm(algorithm));
        let (c, walls) = near_rectangle(&mut sys);
        sys.add_constraint(Constraint::horizontal(&walls[0])).unwrap();
        sys.add_constraint(Constraint::vertical(&walls[1])).unwrap();
        sys.add_constraint(Constraint::horizontal(&walls[2])).unwrap();
        sys.add_constraint(Constraint::vertical(&walls[3])).unwrap();
        assert_eq!(sys.dof(), 4);

        assert_eq!(sys.solve(), SolveStatus::Success, "{algorithm:?}");
        let tol = sys.solver_parameters().convergence_tolerance;
        assert!((sys.point(&c[0]).1 - sys.point(&c[1]).1).abs() < tol);
        assert!((sys.point(&c[2]).1 - sys.point(&c[3]).1).abs() < tol);
        assert!((sys.point(&c[1]).0 - sys.point(&c[2]).0).abs() < tol);
        assert!((sys.point(&c[3]).0 - sys.point(&c[0]).0).abs() < tol);
    }
}

#[test]
fn near_rectangle_partitioned_matches_dof() {
    let mut sys = System::new();
    let (_, walls) = near_rectangle(&mut sys);
    for (i, wall) in walls.iter().enumerate() {
        let c = if i % 2 == 0 {
            Constraint::horizontal(wall)
        } else {
            Constraint::vertical(wall)
        };
        sys.add_constraint(c).unwrap();
    }
    let whole = sys.dof();
    sys.partition_constraints();
    // Each Equal touches its own pair of coordinates.
    assert_eq!(sys.subsystems().len(), 4);
    assert_eq!(sys.dof(), whole);
    assert_eq!(sys.solve(), SolveStatus::Success);
}

#[test]
fn already_equal_parameters_take_zero_iterations() {
    for algorithm in ALGORITHMS {
        let mut sys = System::with_parameters(SolverParameters::with_algorithm(algorithm));
        let a = sys.add_param(4.25);
        let b = sys.add_param(4.25);
        sys.add_constraint(Constraint::equal(a, b)).unwrap();
        assert_eq!(sys.solve(), SolveStatus::Success);
        assert_eq!(sys.last_iterations(), 0);
    }
}

#[test]
fn second_solve_is_idempotent() {
    let mut sys = System::new();
    let (_, walls) = near_rectangle(&mut sys);
    sys.add_constraint(Constraint::horizontal(&walls[0])).unwrap();
    sys.add_constraint(Constraint::perpendicular(walls[0], walls[1]))
        .unwrap();
    sys.add_constraint(Constraint::parallel(walls[1], walls[3]))
        .unwrap();
    sys.add_constraint(Constraint::p2p_distance(walls[0].p1, walls[0].p2, 200.0))
        .unwrap();
    assert!(sys.solve().is_solved());
    let first = snapshot(&sys);

    assert!(sys.solve().is_solved());
    let tol = sys.solver_parameters().convergence_tolerance;
    for (a, b) in first.iter().zip(snapshot(&sys)) {
        assert!((a - b).abs() <= tol);
    }
}

#[test]
fn parallel_and_perpendicular_hold_after_solve() {
    for algorithm in ALGORITHMS {
        let mut config = SolverParameters::with_algorithm(algorithm);
        config.rescale_constraints = true;
        config.max_iterations = 500;
        let mut sys = System::with_parameters(config);
        let (_, walls) = near_rectangle(&mut sys);
        sys.add_constraint(Constraint::parallel(walls[0], walls[2]))
            .unwrap();
        sys.add_constraint(Constraint::perpendicular(walls[0], walls[1]))
            .unwrap();
        assert!(sys.solve().is_solved(), "{algorithm:?}");

        let (ax, ay) = direction(&sys, &walls[0]);
        let (bx, by) = direction(&sys, &walls[2]);
        let (cx, cy) = direction(&sys, &walls[1]);
        let cross = (ax * by - ay * bx) / ((ax.hypot(ay)) * (bx.hypot(by)));
        let dot = (ax * cx + ay * cy) / ((ax.hypot(ay)) * (cx.hypot(cy)));
        assert!(cross.abs() < 1e-9, "{algorithm:?}: cross = {cross}");
        assert!(dot.abs() < 1e-9, "{algorithm:?}: dot = {dot}");
    }
}

#[test]
fn anchored_square_is_well_constrained() {
    let mut sys = System::new();
    let p0 = sys.add_fixed_point(0.0, 0.0);
    let p1 = sys.add_point(9.0, 0.5);
    let p2 = sys.add_point(10.5, 11.0);
    let p3 = sys.add_point(-0.5, 9.5);
    let walls = [
        Line::new(p0, p1),
        Line::new(p1, p2),
        Line::new(p2, p3),
        Line::new(p3, p0),
    ];
    sys.add_constraints([
        Constraint::horizontal(&walls[0]),
        Constraint::vertical(&walls[1]),
        Constraint::horizontal(&walls[2]),
        Constraint::vertical(&walls[3]),
        Constraint::p2p_distance(p0, p1, 10.0),
        Constraint::p2p_distance(p1, p2, 10.0),
    ])
    .unwrap();
    assert_eq!(sys.dof(), 0);
    assert_eq!(sys.diagnose(), DiagnosticResult::WellConstrained);
    assert_eq!(sys.solve(), SolveStatus::Success);
    let (x2, y2) = sys.point(&p2);
    assert_relative_eq!(x2, 10.0, epsilon = 1e-9);
    assert_relative_eq!(y2, 10.0, epsilon = 1e-9);
}

#[test]
fn anchored_room_with_right_angles_solves_with_every_algorithm() {
    for algorithm in ALGORITHMS {
        let mut config = SolverParameters::with_algorithm(algorithm);
        config.max_iterations = 500;
        let mut sys = System::with_parameters(config);
        let p0 = sys.add_fixed_point(0.0, 0.0);
        let p1 = sys.add_point(9.0, 0.5);
        let p2 = sys.add_point(10.5, 11.0);
        let p3 = sys.add_point(-0.5, 9.5);
        let walls = [
            Line::new(p0, p1),
            Line::new(p1, p2),
            Line::new(p2, p3),
            Line::new(p3, p0),
        ];
        sys.add_constraints([
            Constraint::horizontal(&walls[0]),
            Constraint::perpendicular(walls[0], walls[1]),
            Constraint::perpendicular(walls[1], walls[2]),
            Constraint::perpendicular(walls[2], walls[3]),
            Constraint::p2p_distance(p0, p1, 10.0),
            Constraint::p2p_distance(p1, p2, 10.0),
        ])
        .unwrap();
        assert_eq!(sys.dof(), 0);

        assert_eq!(sys.solve(), SolveStatus::Success, "{algorithm:?}");
        for (p, (x, y)) in [(p1, (10.0, 0.0)), (p2, (10.0, 10.0)), (p3, (0.0, 10.0))] {
            let (px, py) = sys.point(&p);
            assert_relative_eq!(px, x, epsilon = 1e-9);
            assert_relative_eq!(py, y, epsilon = 1e-9);
        }
    }
}

#[test]
fn floor_plan_scale_equal_succeeds_with_every_algorithm() {
    for algorithm in ALGORITHMS {
        let mut sys = System::with_parameters(SolverParameters::with_algorithm(algorithm));
        let a = sys.add_param(0.0);
        let b = sys.add_param(91.844);
        sys.add_constraint(Constraint::equal(a, b)).unwrap();
        assert_eq!(sys.solve(), SolveStatus::Success, "{algorithm:?}");
        assert!((sys.value(a) - sys.value(b)).abs() < 1e-10);
    }
}

#[test]
fn point_on_circle_and_tangent_line() {
    let mut sys = System::new();
    let center = sys.add_fixed_point(0.0, 0.0);
    let circle = sys.add_circle(center, 2.0);
    sys.set_fixed(circle.radius, true).unwrap();
    let a = sys.add_point(-5.0, 2.7);
    let b = sys.add_point(5.0, 2.4);
    let line = Line::new(a, b);
    let p = sys.add_point(1.0, 1.0);
    sys.add_constraints([
        Constraint::tangent_line_circle(line, circle),
        Constraint::point_on_circle(p, circle),
    ])
    .unwrap();
    assert_eq!(sys.solve(), SolveStatus::Success);
    let (px, py) = sys.point(&p);
    assert_relative_eq!(px.hypot(py), 2.0, epsilon = 1e-9);
    assert!(sys.max_error() < 1e-10);
}

#[test]
fn conflicting_distances_do_not_converge() {
    let mut sys = System::new();
    let p1 = sys.add_fixed_point(0.0, 0.0);
    let p2 = sys.add_point(1.0, 0.0);
    let d1 = sys
        .add_constraint(Constraint::p2p_distance(p1, p2, 1.0))
        .unwrap();
    let d2 = sys
        .add_constraint(Constraint::p2p_distance(p1, p2, 3.0))
        .unwrap();
    sys.add_constraint(Constraint::equal(p2.y, p1.y)).unwrap();
    assert_eq!(sys.solve(), SolveStatus::NotConverged);
    assert_eq!(
        sys.diagnose(),
        DiagnosticResult::Conflicting {
            constraints: vec![d1, d2]
        }
    );
}

#[test]
fn removing_a_constraint_returns_to_configured() {
    let mut sys = System::new();
    let a = sys.add_param(1.0);
    let b = sys.add_param(2.0);
    let id = sys.add_constraint(Constraint::equal(a, b)).unwrap();
    sys.solve();
    assert_eq!(sys.state(), SystemState::Solved(SolveStatus::Success));
    sys.add_constraint(Constraint::difference(a, b, 0.0)).unwrap();
    assert_eq!(sys.state(), SystemState::Configured);
    sys.remove_constraint(id).unwrap();
    assert_eq!(sys.state(), SystemState::Configured);
    sys.clear_constraints();
    assert_eq!(sys.state(), SystemState::Empty);
}

#[test]
fn solver_parameters_round_trip_through_json() {
    let mut config = SolverParameters::with_algorithm(Algorithm::Bfgs);
    config.max_iterations = 250;
    config.dog_leg.max_radius = 50.0;
    let json = serde_json::to_string(&config).unwrap();
    let back: SolverParameters = serde_json::from_str(&json).unwrap();
    assert_eq!(back.algorithm, Algorithm::Bfgs);
    assert_eq!(back.max_iterations, 250);
    assert_relative_eq!(back.dog_leg.max_radius, 50.0);
    assert_relative_eq!(back.convergence_tolerance, 1e-10, max_relative = 1e-12);
    assert_relative_eq!(back.qr_pivot_threshold, 1e-13, max_relative = 1e-12);
}

#[test]
fn partial_json_config_fills_defaults() {
    let config: SolverParameters = serde_json::from_str(
        r#"{ "algorithm": "LevenbergMarquardt", "dog_leg": { "initial_radius": 4.0 } }"#,
    )
    .unwrap();
    assert_eq!(config.algorithm, Algorithm::LevenbergMarquardt);
    assert_eq!(config.max_iterations, 100);
    assert_relative_eq!(config.dog_leg.initial_radius, 4.0);
    assert_relative_eq!(config.dog_leg.max_radius, 1e10);
}
