use std::ops::Range;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::convex::ConvexPolyhedron;
use super::error::ShapeError;
use super::mesh::Aabb;

/// Regular grid of heights. Sample `(i, j)` sits at local
/// `(i * element_size, j * element_size, data[i][j])`; height grows along +Z.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Heightfield {
    data: Vec<Vec<f32>>,
    element_size: f32,
    min_value: f32,
    max_value: f32,
}

/// Depth of the pillar below the lowest sample.
const PILLAR_DEPTH: f32 = 1.0;

impl Heightfield {
    pub fn new(data: Vec<Vec<f32>>, element_size: f32) -> Result<Self, ShapeError> {
        if !(element_size.is_finite() && element_size > 0.0) {
            return Err(ShapeError::InvalidDimension {
                what: "element size",
                value: element_size,
            });
        }
        let rows = data.len();
        let cols = data.first().map_or(0, Vec::len);
        if rows < 2 || cols < 2 {
            return Err(ShapeError::HeightfieldTooSmall { rows, cols });
        }

        let mut min_value = f32::INFINITY;
        let mut max_value = f32::NEG_INFINITY;
        for (row, samples) in data.iter().enumerate() {
            if samples.len() != cols {
                return Err(ShapeError::RaggedHeightfield {
                    row,
                    len: samples.len(),
                    expected: cols,
                });
            }
            for (col, &h) in samples.iter().enumerate() {
                if !h.is_finite() {
                    return Err(ShapeError::NonFiniteHeight { row, col });
                }
                min_value = min_value.min(h);
                max_value = max_value.max(h);
            }
        }

        Ok(Self {
            data,
            element_size,
            min_value,
            max_value,
        })
    }

    pub fn element_size(&self) -> f32 {
        self.element_size
    }

    /// Number of samples along local X.
    pub fn size_x(&self) -> usize {
        self.data.len()
    }

    /// Number of samples along local Y.
    pub fn size_y(&self) -> usize {
        self.data[0].len()
    }

    pub fn min_value(&self) -> f32 {
        self.min_value
    }

    pub fn max_value(&self) -> f32 {
        self.max_value
    }

    pub fn height(&self, i: usize, j: usize) -> f32 {
        self.data[i][j]
    }

    fn sample(&self, i: usize, j: usize) -> Vec3 {
        Vec3::new(
            i as f32 * self.element_size,
            j as f32 * self.element_size,
            self.data[i][j],
        )
    }

    /// Corners of one of the two triangles of cell `(i, j)`, counter-clockwise
    /// seen from +Z.
    pub fn triangle(&self, i: usize, j: usize, upper: bool) -> [Vec3; 3] {
        if upper {
            [
                self.sample(i + 1, j + 1),
                self.sample(i, j + 1),
                self.sample(i + 1, j),
            ]
        } else {
            [
                self.sample(i, j),
                self.sample(i + 1, j),
                self.sample(i, j + 1),
            ]
        }
    }

    /// Prism under one cell triangle, reaching below the lowest sample.
    ///
    /// Returns the hull (centred on its vertex average) and its local offset.
    pub fn pillar(&self, i: usize, j: usize, upper: bool) -> Result<(ConvexPolyhedron, Vec3), ShapeError> {
        let top = self.triangle(i, j, upper);
        let floor = self.min_value - PILLAR_DEPTH;
        let mut vertices: Vec<Vec3> = top.to_vec();
        vertices.extend(top.iter().map(|v| Vec3::new(v.x, v.y, floor)));
        let offset = vertices.iter().copied().sum::<Vec3>() / vertices.len() as f32;
        for v in &mut vertices {
            *v -= offset;
        }
        let faces = vec![
            vec![0, 1, 2],
            vec![5, 4, 3],
            vec![0, 3, 4, 1],
            vec![1, 4, 5, 2],
            vec![2, 5, 3, 0],
        ];
        Ok((ConvexPolyhedron::new(vertices, faces)?, offset))
    }

    /// Cells whose footprint overlaps a local-space box, clamped to the grid.
    /// Empty ranges mean no overlap.
    pub fn cell_range(&self, local: &Aabb) -> (Range<usize>, Range<usize>) {
        let cells_x = self.size_x() - 1;
        let cells_y = self.size_y() - 1;
        if local.max.z < self.min_value - PILLAR_DEPTH || local.min.z > self.max_value {
            return (0..0, 0..0);
        }
        let clamp = |v: f32, cells: usize| -> usize {
            if v <= 0.0 {
                0
            } else {
                ((v / self.element_size).floor() as usize).min(cells)
            }
        };
        let x0 = clamp(local.min.x, cells_x);
        let x1 = clamp(local.max.x, cells_x - 1) + 1;
        let y0 = clamp(local.min.y, cells_y);
        let y1 = clamp(local.max.y, cells_y - 1) + 1;
        if local.max.x < 0.0 || local.max.y < 0.0 {
            return (0..0, 0..0);
        }
        (x0..x1.max(x0), y0..y1.max(y0))
    }

    pub fn local_aabb(&self) -> Aabb {
        Aabb::new(
            Vec3::new(0.0, 0.0, self.min_value - PILLAR_DEPTH),
            Vec3::new(
                (self.size_x() - 1) as f32 * self.element_size,
                (self.size_y() - 1) as f32 * self.element_size,
                self.max_value,
            ),
        )
    }

    pub fn bounding_radius(&self) -> f32 {
        let max_abs = self.min_value.abs().max(self.max_value.abs());
        Vec3::new(
            self.size_x() as f32 * self.element_size,
            self.size_y() as f32 * self.element_size,
            max_abs,
        )
        .length()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bumpy() -> Heightfield {
        let data = (0..5)
            .map(|i| (0..4).map(|j| (i + j) as f32 * 0.25).collect())
            .collect();
        Heightfield::new(data, 2.0).unwrap()
    }

    #[test]
    fn triangles_face_up() {
        let hf = bumpy();
        for upper in [false, true] {
            let [a, b, c] = hf.triangle(1, 1, upper);
            assert!((b - a).cross(c - a).z > 0.0);
        }
    }

    #[test]
    fn pillar_top_matches_triangle() {
        let hf = bumpy();
        let (pillar, offset) = hf.pillar(2, 1, false).unwrap();
        let tri = hf.triangle(2, 1, false);
        for (k, v) in tri.iter().enumerate() {
            assert!((pillar.vertices()[k] + offset).abs_diff_eq(*v, 1e-5));
        }
        assert!(pillar.face_normals()[0].z > 0.0);
        assert!(pillar.face_normals()[1].abs_diff_eq(Vec3::NEG_Z, 1e-5));
    }

    #[test]
    fn cell_range_is_clamped() {
        let hf = bumpy();
        let (xs, ys) = hf.cell_range(&Aabb::new(Vec3::new(2.5, -3.0, 0.0), Vec3::new(4.5, 1.0, 1.0)));
        assert_eq!(xs, 1..3);
        assert_eq!(ys, 0..1);

        let (xs, _) = hf.cell_range(&Aabb::new(Vec3::splat(-10.0), Vec3::new(-5.0, 1.0, 1.0)));
        assert!(xs.is_empty());

        let (xs, ys) = hf.cell_range(&Aabb::new(Vec3::splat(-100.0), Vec3::splat(100.0)));
        assert_eq!(xs, 0..4);
        assert_eq!(ys, 0..3);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = Heightfield::new(vec![vec![0.0, 0.0], vec![0.0]], 1.0).unwrap_err();
        assert_eq!(
            err,
            ShapeError::RaggedHeightfield {
                row: 1,
                len: 1,
                expected: 2
            }
        );
    }
}
