use proptest::prelude::*;
use strata_geom::Vec3;

fn small_f() -> impl Strategy<Value = f32> {
    -1_000.0f32..=1_000.0
}

fn vec3() -> impl Strategy<Value = Vec3> {
    (small_f(), small_f(), small_f()).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

proptest! {
    #[test]
    fn cross_is_orthogonal(a in vec3(), b in vec3()) {
        let c = a.cross(b);
        let scale = a.length().max(b.length()).max(1.0);
        prop_assert!((c.dot(a) / (scale * scale)).abs() < 1e-3);
        prop_assert!((c.dot(b) / (scale * scale)).abs() < 1e-3);
    }

    #[test]
    fn normalized_or_up_is_unit(v in vec3()) {
        let n = v.normalized_or_up();
        prop_assert!((n.length() - 1.0).abs() < 1e-3);
    }

    #[test]
    fn lerp_endpoints(a in vec3(), b in vec3()) {
        prop_assert_eq!(a.lerp(b, 0.0), a);
        let end = a.lerp(b, 1.0);
        prop_assert!((end - b).length() < 1e-3);
    }
}

#[test]
fn zero_normal_falls_back_to_up() {
    assert_eq!(Vec3::ZERO.normalized_or_up(), Vec3::UP);
}
