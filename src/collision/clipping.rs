use glam::Vec3;

/// Points within this distance outside a plane still count as inside.
const EPSILON: f32 = 1e-4;

/// Plane `normal · p = distance`; the inside is where the signed distance is negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub distance: f32,
}

impl Plane {
    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Self {
        let n = normal.normalize_or_zero();
        Self {
            normal: n,
            distance: n.dot(point),
        }
    }

    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) - self.distance
    }
}

/// Clips the polygon against each plane in turn (Sutherland-Hodgman).
pub fn clip_polygon(vertices: &[Vec3], planes: &[Plane]) -> Vec<Vec3> {
    let mut output = vertices.to_vec();
    for plane in planes {
        output = clip_against_plane(&output, *plane);
        if output.is_empty() {
            break;
        }
    }
    output
}

/// Keeps the part of the polygon on the inner side of `plane`.
pub fn clip_against_plane(vertices: &[Vec3], plane: Plane) -> Vec<Vec3> {
    if vertices.len() < 2 {
        return vertices
            .iter()
            .copied()
            .filter(|&v| plane.signed_distance(v) <= EPSILON)
            .collect();
    }

    let mut clipped = Vec::with_capacity(vertices.len() + 1);
    for i in 0..vertices.len() {
        let current = vertices[i];
        let next = vertices[(i + 1) % vertices.len()];

        let current_dist = plane.signed_distance(current);
        let next_dist = plane.signed_distance(next);

        let current_inside = current_dist <= EPSILON;
        let next_inside = next_dist <= EPSILON;

        match (current_inside, next_inside) {
            (true, true) => clipped.push(next),
            (true, false) => {
                if let Some(p) = line_plane_intersection(current, next, current_dist, next_dist) {
                    clipped.push(p);
                }
            }
            (false, true) => {
                if let Some(p) = line_plane_intersection(current, next, current_dist, next_dist) {
                    clipped.push(p);
                }
                clipped.push(next);
            }
            (false, false) => {}
        }
    }

    clipped
}

fn line_plane_intersection(start: Vec3, end: Vec3, start_dist: f32, end_dist: f32) -> Option<Vec3> {
    let denom = start_dist - end_dist;
    if denom.abs() <= f32::EPSILON {
        return None;
    }
    let t = start_dist / denom;
    Some(start + (end - start) * t)
}
