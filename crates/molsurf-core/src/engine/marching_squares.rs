//! Contour lines: marching squares over a plane sampled through the volume, and the same
//! walk over the triangles of an already colored isosurface.

use crate::core::models::mesh::Mesh;
use crate::core::models::volume::{Plane, VolumeData};
use crate::core::utils::geometry::plane_basis;
use nalgebra::{Point3, Vector3};
use std::collections::HashMap;
use tracing::{debug, error};

/// Anything that yields a scalar at an arbitrary point in space.
pub trait ScalarField {
    fn sample(&self, point: &Point3<f64>) -> f32;
}

impl ScalarField for VolumeData {
    fn sample(&self, point: &Point3<f64>) -> f32 {
        self.interpolated_value_at(point)
    }
}

/// A square grid of samples spanning the part of a plane that cuts through a volume.
#[derive(Debug, Clone)]
pub struct PlaneGrid {
    plane: Plane,
    origin: Point3<f64>,
    axes: (Vector3<f64>, Vector3<f64>),
    step: f64,
    counts: [usize; 2],
    values: Vec<f32>,
}

impl PlaneGrid {
    /// Samples `field` over the projection of `bounds` onto `plane`, with `resolution` points
    /// along the longer in-plane extent. Points where the field is undefined hold NaN.
    pub fn sample(
        field: &impl ScalarField,
        bounds: &VolumeData,
        plane: &Plane,
        resolution: usize,
    ) -> Option<Self> {
        if bounds.is_empty() || resolution < 2 {
            return None;
        }
        let axes = plane_basis(plane.normal());
        let anchor = plane.project(bounds.origin());
        let mut min = [f64::INFINITY; 2];
        let mut max = [f64::NEG_INFINITY; 2];
        for corner in bounds.corner_points() {
            let offset = plane.project(&corner) - anchor;
            for (axis, coordinate) in [offset.dot(&axes.0), offset.dot(&axes.1)]
                .into_iter()
                .enumerate()
            {
                min[axis] = min[axis].min(coordinate);
                max[axis] = max[axis].max(coordinate);
            }
        }
        let extent = (max[0] - min[0]).max(max[1] - min[1]);
        if extent <= 0.0 {
            return None;
        }
        let step = extent / (resolution - 1) as f64;
        let counts = [0, 1].map(|axis| ((max[axis] - min[axis]) / step).round() as usize + 1);
        let origin = anchor + axes.0 * min[0] + axes.1 * min[1];

        let mut grid = Self {
            plane: *plane,
            origin,
            axes,
            step,
            counts,
            values: Vec::with_capacity(counts[0] * counts[1]),
        };
        for a in 0..counts[0] {
            for b in 0..counts[1] {
                let value = field.sample(&grid.point_at(a, b));
                grid.values.push(value);
            }
        }
        Some(grid)
    }

    pub fn plane(&self) -> &Plane {
        &self.plane
    }

    pub fn counts(&self) -> [usize; 2] {
        self.counts
    }

    pub fn point_at(&self, a: usize, b: usize) -> Point3<f64> {
        self.origin + self.axes.0 * (a as f64 * self.step) + self.axes.1 * (b as f64 * self.step)
    }

    #[inline]
    pub fn value_at(&self, a: usize, b: usize) -> f32 {
        self.values[a * self.counts[1] + b]
    }

    /// Finite minimum and maximum over the grid.
    pub fn value_range(&self) -> Option<(f32, f32)> {
        self.values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |range, v| match range {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Bilinear interpolation at the projection of `point` onto the grid; NaN off the grid.
    pub fn interpolated_pixel_value(&self, point: &Point3<f64>) -> f32 {
        let offset = self.plane.project(point) - self.origin;
        let u = offset.dot(&self.axes.0) / self.step;
        let v = offset.dot(&self.axes.1) / self.step;
        let max_a = (self.counts[0] - 1) as f64;
        let max_b = (self.counts[1] - 1) as f64;
        const SLACK: f64 = 1e-3;
        if u < -SLACK || v < -SLACK || u > max_a + SLACK || v > max_b + SLACK {
            return f32::NAN;
        }
        let (u, v) = (u.clamp(0.0, max_a), v.clamp(0.0, max_b));
        let a0 = (u.floor() as usize).min(self.counts[0].saturating_sub(2));
        let b0 = (v.floor() as usize).min(self.counts[1].saturating_sub(2));
        let a1 = (a0 + 1).min(self.counts[0] - 1);
        let b1 = (b0 + 1).min(self.counts[1] - 1);
        let (wu, wv) = ((u - a0 as f64) as f32, (v - b0 as f64) as f32);

        let bottom = self.value_at(a0, b0) * (1.0 - wu) + self.value_at(a1, b0) * wu;
        let top = self.value_at(a0, b1) * (1.0 - wu) + self.value_at(a1, b1) * wu;
        bottom * (1.0 - wv) + top * wv
    }
}

/// One contour line piece; `level` indexes [`ContourSet::levels`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContourSegment {
    pub vertices: [u32; 2],
    pub level: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContourSet {
    pub levels: Vec<f32>,
    pub vertices: Vec<Point3<f64>>,
    pub segments: Vec<ContourSegment>,
}

impl ContourSet {
    pub fn segments_at(&self, level: usize) -> impl Iterator<Item = &ContourSegment> {
        self.segments.iter().filter(move |s| s.level == level)
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// `count` evenly spaced levels strictly between `min` and `max`.
pub fn contour_levels(min: f32, max: f32, count: usize) -> Vec<f32> {
    (1..=count)
        .map(|i| min + (max - min) * i as f32 / (count + 1) as f32)
        .collect()
}

/// Edge pairs cut by the contour for each square configuration. Corners run
/// `(a,b) (a+1,b) (a+1,b+1) (a,b+1)`, bit set when the corner is at or above the level; edge
/// `e` joins corner `e` and corner `e+1`. Saddles (5 and 10) are resolved separately.
const SQUARE_SEGMENTS: [&[(usize, usize)]; 16] = [
    &[],
    &[(3, 0)],
    &[(0, 1)],
    &[(3, 1)],
    &[(1, 2)],
    &[],
    &[(0, 2)],
    &[(3, 2)],
    &[(2, 3)],
    &[(0, 2)],
    &[],
    &[(1, 2)],
    &[(1, 3)],
    &[(0, 1)],
    &[(0, 3)],
    &[],
];

const SQUARE_CORNERS: [(usize, usize); 4] = [(0, 0), (1, 0), (1, 1), (0, 1)];

fn saddle_segments(config: usize, center_inside: bool) -> [(usize, usize); 2] {
    let isolate_even = [(3, 0), (1, 2)];
    let isolate_odd = [(0, 1), (2, 3)];
    match (config, center_inside) {
        (5, true) | (10, false) => isolate_odd,
        _ => isolate_even,
    }
}

fn crossing(pa: &Point3<f64>, va: f32, pb: &Point3<f64>, vb: f32, level: f32) -> Point3<f64> {
    let t = ((level - va) / (vb - va)).clamp(0.0, 1.0) as f64;
    pa + (pb - pa) * t
}

/// Settings for contouring planes and surfaces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarchingSquares {
    pub contour_count: usize,
    /// Samples along the longer side of a plane grid.
    pub resolution: usize,
}

impl MarchingSquares {
    pub fn new(contour_count: usize, resolution: usize) -> Self {
        Self {
            contour_count,
            resolution,
        }
    }

    /// Contours `field` on `plane` clipped to the volume. Refuses, with a logged error, when no
    /// plane was configured.
    pub fn contour_plane(
        &self,
        field: &impl ScalarField,
        bounds: &VolumeData,
        plane: Option<&Plane>,
    ) -> Option<(PlaneGrid, ContourSet)> {
        let Some(plane) = plane else {
            error!("Cannot contour a plane: no plane was defined for this surface");
            return None;
        };
        let grid = PlaneGrid::sample(field, bounds, plane, self.resolution)?;
        let (min, max) = grid.value_range()?;
        let levels = contour_levels(min, max, self.contour_count);
        let contours = Self::contour_grid(&grid, levels);
        debug!(
            "Contoured {}x{} plane grid into {} segments",
            grid.counts[0],
            grid.counts[1],
            contours.segments.len()
        );
        Some((grid, contours))
    }

    /// Marching squares at each of `levels` over every cell of `grid`.
    pub fn contour_grid(grid: &PlaneGrid, levels: Vec<f32>) -> ContourSet {
        let mut set = ContourSet {
            levels,
            ..Default::default()
        };
        let [na, nb] = grid.counts;
        if na < 2 || nb < 2 {
            return set;
        }

        for (level_index, &level) in set.levels.clone().iter().enumerate() {
            // Shared edge key: (is vertical, a, b) of the edge's lower corner.
            let mut memo: HashMap<(bool, usize, usize), u32> = HashMap::new();
            for a in 0..na - 1 {
                for b in 0..nb - 1 {
                    let values = SQUARE_CORNERS.map(|(da, db)| grid.value_at(a + da, b + db));
                    if values.iter().any(|v| v.is_nan()) {
                        continue;
                    }
                    let config = values
                        .iter()
                        .enumerate()
                        .filter(|(_, v)| **v >= level)
                        .fold(0usize, |acc, (i, _)| acc | (1 << i));

                    let pairs: Vec<(usize, usize)> = match config {
                        5 | 10 => {
                            let center = values.iter().sum::<f32>() / 4.0;
                            saddle_segments(config, center >= level).to_vec()
                        }
                        _ => SQUARE_SEGMENTS[config].to_vec(),
                    };

                    let mut vertex_for = |edge: usize, set: &mut ContourSet| -> u32 {
                        let key = match edge {
                            0 => (false, a, b),
                            1 => (true, a + 1, b),
                            2 => (false, a, b + 1),
                            _ => (true, a, b),
                        };
                        *memo.entry(key).or_insert_with(|| {
                            let (c0, c1) = (edge, (edge + 1) % 4);
                            let corner = |c: usize| {
                                let (da, db) = SQUARE_CORNERS[c];
                                grid.point_at(a + da, b + db)
                            };
                            let point =
                                crossing(&corner(c0), values[c0], &corner(c1), values[c1], level);
                            set.vertices.push(point);
                            (set.vertices.len() - 1) as u32
                        })
                    };

                    for (e0, e1) in pairs {
                        let v0 = vertex_for(e0, &mut set);
                        let v1 = vertex_for(e1, &mut set);
                        set.segments.push(ContourSegment {
                            vertices: [v0, v1],
                            level: level_index,
                        });
                    }
                }
            }
        }
        set
    }

    /// Contour lines of the vertex values across the triangles of `mesh`.
    pub fn contour_mesh(&self, mesh: &Mesh) -> Option<ContourSet> {
        let Some((min, max)) = mesh.value_range() else {
            error!("Cannot contour a surface without vertex values");
            return None;
        };
        let mut set = ContourSet {
            levels: contour_levels(min, max, self.contour_count),
            ..Default::default()
        };
        let points = mesh.vertices();
        let values = mesh.values();

        for (level_index, &level) in set.levels.clone().iter().enumerate() {
            let mut memo: HashMap<(u32, u32), u32> = HashMap::new();
            for triangle in mesh.triangles() {
                let [a, b, c] = triangle.vertices;
                let mut cut = Vec::with_capacity(2);
                for (p, q) in [(a, b), (b, c), (c, a)] {
                    let (vp, vq) = (values[p as usize], values[q as usize]);
                    if (vp >= level) == (vq >= level) || vp.is_nan() || vq.is_nan() {
                        continue;
                    }
                    let key = (p.min(q), p.max(q));
                    let index = *memo.entry(key).or_insert_with(|| {
                        set.vertices.push(crossing(
                            &points[p as usize],
                            vp,
                            &points[q as usize],
                            vq,
                            level,
                        ));
                        (set.vertices.len() - 1) as u32
                    });
                    cut.push(index);
                }
                if let [v0, v1] = cut[..] {
                    set.segments.push(ContourSegment {
                        vertices: [v0, v1],
                        level: level_index,
                    });
                }
            }
        }
        Some(set)
    }
}
