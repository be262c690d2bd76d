use nalgebra::{Matrix3, Point3, Unit, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Slack, in lattice units, allowed when sampling a point that lies just outside the grid.
const LATTICE_EPSILON: f64 = 1e-3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VolumeError {
    #[error("Voxel grid {nx}x{ny}x{nz} needs {expected} values but {actual} were supplied")]
    ValueCountMismatch {
        nx: usize,
        ny: usize,
        nz: usize,
        expected: usize,
        actual: usize,
    },
}

/// A plane in Hessian normal form: `normal . p + offset == 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    normal: Unit<Vector3<f64>>,
    offset: f64,
}

impl Plane {
    /// Plane through `point` with the given (not necessarily unit) normal.
    /// Returns `None` for a zero-length normal.
    pub fn new(point: &Point3<f64>, normal: &Vector3<f64>) -> Option<Self> {
        let normal = Unit::try_new(*normal, 1e-12)?;
        let offset = -normal.dot(&point.coords);
        Some(Self { normal, offset })
    }

    /// Plane `a*x + b*y + c*z + d == 0`. Returns `None` when `(a, b, c)` is zero.
    pub fn from_coefficients(a: f64, b: f64, c: f64, d: f64) -> Option<Self> {
        let raw = Vector3::new(a, b, c);
        let length = raw.norm();
        if length < 1e-12 {
            return None;
        }
        Some(Self {
            normal: Unit::new_unchecked(raw / length),
            offset: d / length,
        })
    }

    pub fn normal(&self) -> &Unit<Vector3<f64>> {
        &self.normal
    }

    /// Normalized `[a, b, c, d]` coefficients.
    pub fn coefficients(&self) -> [f64; 4] {
        [self.normal.x, self.normal.y, self.normal.z, self.offset]
    }

    pub fn signed_distance(&self, point: &Point3<f64>) -> f64 {
        self.normal.dot(&point.coords) + self.offset
    }

    pub fn project(&self, point: &Point3<f64>) -> Point3<f64> {
        point - self.normal.into_inner() * self.signed_distance(point)
    }
}

/// Direction of the outermost (x) loop of the marching-cubes walk. Run lengths and edge
/// characters are written in walk order; JVXL files record the order they were written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WalkOrder {
    #[default]
    Ascending,
    Descending,
}

/// Geometry of an affine lattice without any samples attached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lattice {
    pub origin: Point3<f64>,
    pub vectors: [Vector3<f64>; 3],
    pub counts: [usize; 3],
}

impl Lattice {
    #[inline]
    pub fn point_at(&self, i: usize, j: usize, k: usize) -> Point3<f64> {
        self.origin
            + self.vectors[0] * i as f64
            + self.vectors[1] * j as f64
            + self.vectors[2] * k as f64
    }

    #[inline]
    pub fn index(&self, i: usize, j: usize, k: usize) -> usize {
        (i * self.counts[1] + j) * self.counts[2] + k
    }

    pub fn point_count(&self) -> usize {
        self.counts.iter().product()
    }
}

/// Scalar samples on a general (possibly non-orthogonal) affine lattice.
///
/// Lattice point `(i, j, k)` sits at `origin + i*v0 + j*v1 + k*v2`. Values are stored with the
/// last axis varying fastest, the order used by CUBE and OpenDX files:
/// `values[(i * ny + j) * nz + k]`.
///
/// In plane mode no values are stored; every lookup returns the signed distance from the
/// lattice point to the plane, so a planar slice can be triangulated by the same marching
/// cubes pass that handles file data.
#[derive(Debug, Clone)]
pub struct VolumeData {
    origin: Point3<f64>,
    vectors: [Vector3<f64>; 3],
    counts: [usize; 3],
    values: Vec<f32>,
    plane: Option<Plane>,
    inverse: Option<Matrix3<f64>>,
}

impl VolumeData {
    pub fn new(
        origin: Point3<f64>,
        vectors: [Vector3<f64>; 3],
        counts: [usize; 3],
        values: Vec<f32>,
    ) -> Result<Self, VolumeError> {
        let expected = counts.iter().product::<usize>();
        if values.len() != expected {
            return Err(VolumeError::ValueCountMismatch {
                nx: counts[0],
                ny: counts[1],
                nz: counts[2],
                expected,
                actual: values.len(),
            });
        }
        Ok(Self {
            origin,
            vectors,
            counts,
            values,
            plane: None,
            inverse: Self::lattice_inverse(&vectors),
        })
    }

    /// A lattice whose field is the signed distance to `plane`.
    pub fn plane_field(
        origin: Point3<f64>,
        vectors: [Vector3<f64>; 3],
        counts: [usize; 3],
        plane: Plane,
    ) -> Self {
        Self {
            origin,
            vectors,
            counts,
            values: Vec::new(),
            plane: Some(plane),
            inverse: Self::lattice_inverse(&vectors),
        }
    }

    /// The same lattice with its field replaced by the distance to `plane`.
    pub fn with_plane(&self, plane: Plane) -> Self {
        Self::plane_field(self.origin, self.vectors, self.counts, plane)
    }

    fn lattice_inverse(vectors: &[Vector3<f64>; 3]) -> Option<Matrix3<f64>> {
        Matrix3::from_columns(vectors).try_inverse()
    }

    pub fn lattice(&self) -> Lattice {
        Lattice {
            origin: self.origin,
            vectors: self.vectors,
            counts: self.counts,
        }
    }

    pub fn origin(&self) -> &Point3<f64> {
        &self.origin
    }

    pub fn vectors(&self) -> &[Vector3<f64>; 3] {
        &self.vectors
    }

    pub fn counts(&self) -> [usize; 3] {
        self.counts
    }

    pub fn point_count(&self) -> usize {
        self.counts.iter().product()
    }

    /// True when any axis has no samples; such a grid yields no surface.
    pub fn is_empty(&self) -> bool {
        self.counts.contains(&0)
    }

    pub fn plane(&self) -> Option<&Plane> {
        self.plane.as_ref()
    }

    pub fn is_plane(&self) -> bool {
        self.plane.is_some()
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    #[inline]
    pub fn index(&self, i: usize, j: usize, k: usize) -> usize {
        (i * self.counts[1] + j) * self.counts[2] + k
    }

    /// Sample at lattice point `(i, j, k)`. Indices must lie in `[0, count)`.
    #[inline]
    pub fn value_at(&self, i: usize, j: usize, k: usize) -> f32 {
        match &self.plane {
            Some(plane) => plane.signed_distance(&self.point_at(i, j, k)) as f32,
            None => self.values[self.index(i, j, k)],
        }
    }

    /// Checked variant of [`value_at`](Self::value_at).
    pub fn get(&self, i: usize, j: usize, k: usize) -> Option<f32> {
        if i < self.counts[0] && j < self.counts[1] && k < self.counts[2] {
            Some(self.value_at(i, j, k))
        } else {
            None
        }
    }

    /// Signed distance from lattice point `(i, j, k)` to the plane; `None` outside plane mode.
    pub fn plane_distance(&self, i: usize, j: usize, k: usize) -> Option<f32> {
        self.plane
            .as_ref()
            .map(|plane| plane.signed_distance(&self.point_at(i, j, k)) as f32)
    }

    #[inline]
    pub fn point_at(&self, i: usize, j: usize, k: usize) -> Point3<f64> {
        self.origin
            + self.vectors[0] * i as f64
            + self.vectors[1] * j as f64
            + self.vectors[2] * k as f64
    }

    /// Fractional lattice coordinates of a real-space point.
    pub fn lattice_coordinates(&self, point: &Point3<f64>) -> Option<Vector3<f64>> {
        self.inverse.map(|inverse| inverse * (point - self.origin))
    }

    /// Trilinear interpolation among the eight lattice samples surrounding `point`.
    ///
    /// Returns `NaN` for points outside the grid or when the basis is degenerate.
    pub fn interpolated_value_at(&self, point: &Point3<f64>) -> f32 {
        if let Some(plane) = &self.plane {
            return plane.signed_distance(point) as f32;
        }
        if self.is_empty() {
            return f32::NAN;
        }
        let Some(fractional) = self.lattice_coordinates(point) else {
            return f32::NAN;
        };

        let mut lower = [0usize; 3];
        let mut upper = [0usize; 3];
        let mut weight = [0f64; 3];
        for axis in 0..3 {
            let max = (self.counts[axis] - 1) as f64;
            let f = fractional[axis];
            if f < -LATTICE_EPSILON || f > max + LATTICE_EPSILON {
                return f32::NAN;
            }
            let f = f.clamp(0.0, max);
            let base = (f.floor() as usize).min(self.counts[axis].saturating_sub(2));
            lower[axis] = base;
            upper[axis] = (base + 1).min(self.counts[axis] - 1);
            weight[axis] = f - base as f64;
        }

        let mut sum = 0.0f64;
        for corner in 0..8 {
            let mut w = 1.0;
            let mut index = [0usize; 3];
            for axis in 0..3 {
                if corner & (1 << axis) != 0 {
                    w *= weight[axis];
                    index[axis] = upper[axis];
                } else {
                    w *= 1.0 - weight[axis];
                    index[axis] = lower[axis];
                }
            }
            if w != 0.0 {
                sum += w * self.value_at(index[0], index[1], index[2]) as f64;
            }
        }
        sum as f32
    }

    /// Minimum and maximum finite stored value.
    pub fn value_range(&self) -> Option<(f32, f32)> {
        self.values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |range, v| match range {
                None => Some((v, v)),
                Some((min, max)) => Some((min.min(v), max.max(v))),
            })
    }

    /// The eight corners of the lattice's bounding parallelepiped.
    pub fn corner_points(&self) -> [Point3<f64>; 8] {
        let last = self.counts.map(|n| n.saturating_sub(1));
        std::array::from_fn(|corner| {
            self.point_at(
                if corner & 1 != 0 { last[0] } else { 0 },
                if corner & 2 != 0 { last[1] } else { 0 },
                if corner & 4 != 0 { last[2] } else { 0 },
            )
        })
    }
}
