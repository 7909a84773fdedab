// tests/geometry.rs
use glam::DVec2;
use robot_arena::{OrientedRect, check_oriented_overlap, clamp_to_world, point_in_box};

fn square(x: f64, y: f64, half: f64, angle: f64) -> OrientedRect {
    OrientedRect::new(DVec2::new(x, y), DVec2::splat(half), angle)
}

#[test]
fn test_overlap_is_symmetric() {
    let cases = [
        (square(0.0, 0.0, 10.0, 0.0), square(5.0, 5.0, 10.0, 30.0)),
        (square(0.0, 0.0, 10.0, 45.0), square(24.0, 0.0, 10.0, 0.0)),
        (square(0.0, 0.0, 10.0, 45.0), square(25.0, 0.0, 10.0, 0.0)),
        (square(100.0, 0.0, 5.0, 10.0), square(0.0, 0.0, 5.0, 80.0)),
    ];
    for (a, b) in &cases {
        assert_eq!(
            check_oriented_overlap(a, b),
            check_oriented_overlap(b, a),
            "overlap must not depend on argument order: {a:?} / {b:?}"
        );
    }
}

#[test]
fn test_touching_edges_overlap() {
    let a = square(0.0, 0.0, 10.0, 0.0);
    let touching = square(20.0, 0.0, 10.0, 0.0);
    let apart = square(20.001, 0.0, 10.0, 0.0);

    assert!(check_oriented_overlap(&a, &touching), "shared edge counts as contact");
    assert!(!check_oriented_overlap(&a, &apart));
}

#[test]
fn test_rotation_changes_reach() {
    // A square rotated 45° reaches 10·√2 ≈ 14.14 along X.
    let diamond = square(0.0, 0.0, 10.0, 45.0);
    assert!(check_oriented_overlap(&diamond, &square(24.0, 0.0, 10.0, 0.0)));
    assert!(!check_oriented_overlap(&diamond, &square(25.0, 0.0, 10.0, 0.0)));

    // Unrotated, the same pair at 24 is well apart.
    let flat = square(0.0, 0.0, 10.0, 0.0);
    assert!(!check_oriented_overlap(&flat, &square(24.0, 0.0, 10.0, 0.0)));
}

#[test]
fn test_long_thin_rect_uses_own_axes() {
    // 100×4 bar rotated 90° stands vertically.
    let bar = OrientedRect::new(DVec2::ZERO, DVec2::new(50.0, 2.0), 90.0);
    assert!(check_oriented_overlap(&bar, &square(0.0, 45.0, 3.0, 0.0)));
    assert!(!check_oriented_overlap(&bar, &square(45.0, 0.0, 3.0, 0.0)));
}

#[test]
fn test_corners_follow_rotation() {
    let rect = OrientedRect::new(DVec2::new(10.0, 10.0), DVec2::new(4.0, 2.0), 90.0);
    for corner in rect.corners() {
        let d = (corner - rect.center).abs();
        assert!((d.x - 2.0).abs() < 1e-9 && (d.y - 4.0).abs() < 1e-9, "{corner:?}");
    }
}

#[test]
fn test_clamp_and_point_in_box() {
    let clamped = clamp_to_world(DVec2::new(-10.0, 500.0), 400.0, DVec2::new(4.0, 16.0));
    assert_eq!(clamped, DVec2::new(4.0, 384.0));

    let inside = clamp_to_world(DVec2::new(100.0, 200.0), 400.0, DVec2::splat(4.0));
    assert_eq!(inside, DVec2::new(100.0, 200.0));

    assert!(point_in_box(DVec2::new(30.0, 30.0), DVec2::new(0.0, 0.0), DVec2::splat(30.0)));
    assert!(!point_in_box(DVec2::new(31.0, 0.0), DVec2::new(0.0, 0.0), DVec2::splat(30.0)));
}
