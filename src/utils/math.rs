//! Additional math helpers layered on top of `glam`.

use glam::{Mat3, Quat, Vec3};

/// Components below this magnitude count as zero when testing axes.
pub const ALMOST_ZERO: f32 = 1e-6;

/// True when every component of `v` is within `ALMOST_ZERO` of zero.
pub fn almost_zero(v: Vec3) -> bool {
    v.x.abs() < ALMOST_ZERO && v.y.abs() < ALMOST_ZERO && v.z.abs() < ALMOST_ZERO
}

/// True when `a` and `b` agree component-wise within `precision`.
pub fn almost_equal(a: Vec3, b: Vec3, precision: f32) -> bool {
    (a - b).abs().max_element() <= precision
}

/// Returns two unit vectors orthogonal to `normal` and to each other.
///
/// A zero-length normal yields the X/Y basis.
pub fn tangents(normal: Vec3) -> (Vec3, Vec3) {
    let length = normal.length();
    if length <= 0.0 {
        return (Vec3::X, Vec3::Y);
    }
    let n = normal / length;
    let t1 = if n.x.abs() < 0.9 {
        Vec3::X.cross(n).normalize()
    } else {
        Vec3::Y.cross(n).normalize()
    };
    (t1, n.cross(t1))
}

/// Advances `q` by the world-space angular velocity `omega` over `dt`.
///
/// `q += 0.5 * dt * (omega * factor, 0) * q`; the result is not normalised.
pub fn integrate_quat(q: Quat, omega: Vec3, angular_factor: Vec3, dt: f32) -> Quat {
    let w = omega * angular_factor;
    let half_dt = 0.5 * dt;
    Quat::from_xyzw(
        q.x + half_dt * (w.x * q.w + w.y * q.z - w.z * q.y),
        q.y + half_dt * (w.y * q.w + w.z * q.x - w.x * q.z),
        q.z + half_dt * (w.z * q.w + w.x * q.y - w.y * q.x),
        q.w + half_dt * (-w.x * q.x - w.y * q.y - w.z * q.z),
    )
}

/// First-order renormalisation, accurate when `q` is already close to unit length.
pub fn normalize_quat_fast(q: Quat) -> Quat {
    let f = (3.0 - q.length_squared()) * 0.5;
    Quat::from_xyzw(q.x * f, q.y * f, q.z * f, q.w * f)
}

/// Exact renormalisation; a zero quaternion falls back to identity.
pub fn normalize_quat(q: Quat) -> Quat {
    let length = q.length();
    if length <= f32::EPSILON {
        Quat::IDENTITY
    } else {
        q / length
    }
}

/// World-space inverse inertia `R * diag(inv_inertia) * R^T`.
pub fn world_inverse_inertia(rotation: Quat, inv_inertia: Vec3) -> Mat3 {
    let r = Mat3::from_quat(rotation);
    r * Mat3::from_diagonal(inv_inertia) * r.transpose()
}

/// Diagonal inertia of a solid box with the given half extents.
pub fn box_inertia(half_extents: Vec3, mass: f32) -> Vec3 {
    let size = half_extents * 2.0;
    let factor = mass / 12.0;
    Vec3::new(
        factor * (size.y * size.y + size.z * size.z),
        factor * (size.x * size.x + size.z * size.z),
        factor * (size.x * size.x + size.y * size.y),
    )
}

/// Closest point to `p` on triangle `abc` (Ericson, Real-Time Collision Detection 5.1.5).
pub fn closest_point_on_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        return a + ab * (d1 / (d1 - d3));
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        return a + ac * (d2 / (d2 - d6));
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        return b + (c - b) * ((d4 - d3) / ((d4 - d3) + (d5 - d6)));
    }

    let denom = 1.0 / (va + vb + vc);
    a + ab * (vb * denom) + ac * (vc * denom)
}

/// Möller–Trumbore segment/triangle test. Returns the ray parameter in
/// `[0, max_t]` and the triangle's geometric normal.
pub fn ray_triangle(
    origin: Vec3,
    direction: Vec3,
    max_t: f32,
    a: Vec3,
    b: Vec3,
    c: Vec3,
) -> Option<(f32, Vec3)> {
    let e1 = b - a;
    let e2 = c - a;
    let p = direction.cross(e2);
    let det = e1.dot(p);
    // Relative cutoff: `det` scales with both edges and the direction.
    let scale = e1.length() * e2.length() * direction.length();
    if det.abs() <= ALMOST_ZERO * scale {
        return None;
    }
    let inv_det = 1.0 / det;
    let s = origin - a;
    let u = s.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(e1);
    let v = direction.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = e2.dot(q) * inv_det;
    if t < 0.0 || t > max_t {
        return None;
    }
    Some((t, e1.cross(e2).normalize_or_zero()))
}
