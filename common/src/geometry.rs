use glam::{DMat3, DVec3, EulerRot};

const PLANE_SPACE_EPSILON: f64 = 0.0001;

/// Two unit vectors spanning the plane orthogonal to `normal`.
///
/// Follows Bullet's `btPlaneSpace1`, so texture axes match what the editors
/// derive. Returns `None` for a (near) zero normal.
pub fn plane_space(normal: DVec3) -> Option<(DVec3, DVec3)> {
    let n = normal;

    if n.z.abs() > std::f64::consts::FRAC_1_SQRT_2 {
        // p in y-z plane
        let a = n.y * n.y + n.z * n.z;

        if a < PLANE_SPACE_EPSILON {
            return None;
        }

        let k = 1. / a.sqrt();
        let p = DVec3::new(0., -n.z * k, n.y * k);
        let q = DVec3::new(a * k, -n.x * p.z, n.x * p.y);

        Some((p, q))
    } else {
        // p in x-y plane
        let a = n.x * n.x + n.y * n.y;

        if a < PLANE_SPACE_EPSILON {
            return None;
        }

        let k = 1. / a.sqrt();
        let p = DVec3::new(-n.y * k, n.x * k, 0.);
        let q = DVec3::new(-n.z * p.y, n.z * p.x, a * k);

        Some((p, q))
    }
}

pub fn centroid<'a>(points: impl IntoIterator<Item = &'a DVec3>) -> Option<DVec3> {
    let (sum, count) = points
        .into_iter()
        .fold((DVec3::ZERO, 0usize), |(sum, count), p| (sum + *p, count + 1));

    (count > 0).then(|| sum / count as f64)
}

/// Plane through three points as `(normal, distance)` with `normal . p == distance`.
pub fn plane_from_points(a: DVec3, b: DVec3, c: DVec3) -> Option<(DVec3, f64)> {
    let normal = (c - a).cross(b - a).try_normalize()?;

    Some((normal, normal.dot(a)))
}

/// Row major rotation matrix for euler degrees applied x, then y, then z.
pub fn euler_rotation_rows(degrees: DVec3) -> [f64; 9] {
    let radians = DVec3::new(
        degrees.x.to_radians(),
        degrees.y.to_radians(),
        degrees.z.to_radians(),
    );

    // row vector convention, so the column major array is the transposed matrix
    DMat3::from_euler(EulerRot::ZYX, radians.z, radians.y, radians.x).to_cols_array()
}
