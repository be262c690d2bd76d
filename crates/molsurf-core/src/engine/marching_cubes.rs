use super::config::WalkOrder;
use super::mc_tables::{
    CORNER_OFFSETS, EDGE_AXIS, EDGE_CORNERS, EDGE_FACES, triangle_count, triangle_edges,
};
use crate::core::jvxl::JvxlError;
use crate::core::jvxl::codec::FractionEncoding;
use crate::core::jvxl::document::JvxlSurface;
use crate::core::jvxl::writer::{expand_run_lengths, run_lengths};
use crate::core::models::mesh::{EDGE_AB, EDGE_BC, EDGE_CA, Mesh};
use crate::core::models::volume::{Lattice, VolumeData};
use std::convert::Infallible;
use tracing::{debug, trace};

const NO_VERTEX: u32 = u32::MAX;

/// Whether `value` lies inside the surface. NaN is never inside.
#[inline]
pub fn is_inside(value: f32, cutoff: f32, is_absolute: bool) -> bool {
    if is_absolute {
        value.abs() >= cutoff
    } else {
        value >= cutoff
    }
}

/// Position of the cutoff crossing between two samples as a fraction from `va` towards `vb`.
///
/// Absolute mode retries against `-cutoff` when the first root falls outside the edge; a
/// fraction still outside `[0, 1]` is NaN.
pub fn edge_fraction(va: f32, vb: f32, cutoff: f32, is_absolute: bool) -> f32 {
    let within = |f: f32| (0.0..=1.0).contains(&f);
    let fraction = (cutoff - va) / (vb - va);
    if within(fraction) {
        return fraction;
    }
    if is_absolute {
        let fraction = (-cutoff - va) / (vb - va);
        if within(fraction) {
            return fraction;
        }
    }
    f32::NAN
}

/// Lattice points in walk order: x in the configured direction, then y, then z ascending.
pub fn walk_points(counts: [usize; 3], order: WalkOrder) -> impl Iterator<Item = [usize; 3]> {
    let [nx, ny, nz] = counts;
    let xs: Box<dyn Iterator<Item = usize>> = match order {
        WalkOrder::Ascending => Box::new(0..nx),
        WalkOrder::Descending => Box::new((0..nx).rev()),
    };
    xs.flat_map(move |i| (0..ny).flat_map(move |j| (0..nz).map(move |k| [i, j, k])))
}

/// Inside/outside flag per lattice point, stored in lattice index order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsideGrid {
    counts: [usize; 3],
    flags: Vec<bool>,
}

impl InsideGrid {
    pub fn from_volume(volume: &VolumeData, cutoff: f32, is_absolute: bool) -> Self {
        let [nx, ny, nz] = volume.counts();
        let mut flags = Vec::with_capacity(volume.point_count());
        for i in 0..nx {
            for j in 0..ny {
                for k in 0..nz {
                    flags.push(is_inside(volume.value_at(i, j, k), cutoff, is_absolute));
                }
            }
        }
        Self {
            counts: volume.counts(),
            flags,
        }
    }

    /// Rebuilds the flags from run lengths written in `order`.
    pub fn from_run_lengths(
        counts: [usize; 3],
        order: WalkOrder,
        runs: &[u32],
    ) -> Result<Self, JvxlError> {
        let total = counts.iter().product::<usize>();
        let covered = runs.iter().map(|&r| r as usize).sum::<usize>();
        if covered != total {
            return Err(JvxlError::RunLengthMismatch {
                expected: total,
                actual: covered,
            });
        }
        let mut flags = vec![false; total];
        let lattice_index = |[i, j, k]: [usize; 3]| (i * counts[1] + j) * counts[2] + k;
        for (point, inside) in walk_points(counts, order).zip(expand_run_lengths(runs)) {
            flags[lattice_index(point)] = inside;
        }
        Ok(Self { counts, flags })
    }

    #[inline]
    pub fn get(&self, [i, j, k]: [usize; 3]) -> bool {
        self.flags[(i * self.counts[1] + j) * self.counts[2] + k]
    }

    pub fn run_lengths(&self, order: WalkOrder) -> Vec<u32> {
        run_lengths(walk_points(self.counts, order).map(|p| self.get(p)))
    }
}

/// Supplies crossing fractions for the edges the walk visits.
pub trait CrossingSource {
    type Error;

    /// Fraction along the edge from lattice point `from` in the `+axis` direction, and the
    /// scalar value to store on the new vertex.
    fn crossing(&mut self, from: [usize; 3], axis: usize) -> Result<(f32, f32), Self::Error>;
}

/// Computes crossings by interpolating the raw samples.
pub struct VoxelCrossings<'a> {
    pub volume: &'a VolumeData,
    pub cutoff: f32,
    pub is_absolute: bool,
}

impl CrossingSource for VoxelCrossings<'_> {
    type Error = Infallible;

    fn crossing(&mut self, from: [usize; 3], axis: usize) -> Result<(f32, f32), Infallible> {
        let mut to = from;
        to[axis] += 1;
        let va = self.volume.value_at(from[0], from[1], from[2]);
        let vb = self.volume.value_at(to[0], to[1], to[2]);
        let fraction = edge_fraction(va, vb, self.cutoff, self.is_absolute);
        Ok((fraction, va + fraction * (vb - va)))
    }
}

/// Replays crossings from a decoded edge-fraction stream, in the order they were written.
pub struct EncodedCrossings {
    fractions: Vec<f32>,
    next: usize,
    value: f32,
}

impl EncodedCrossings {
    pub fn new(fractions: Vec<f32>, value: f32) -> Self {
        Self {
            fractions,
            next: 0,
            value,
        }
    }

    pub fn consumed(&self) -> usize {
        self.next
    }

    pub fn available(&self) -> usize {
        self.fractions.len()
    }
}

impl CrossingSource for EncodedCrossings {
    type Error = JvxlError;

    fn crossing(&mut self, _from: [usize; 3], _axis: usize) -> Result<(f32, f32), JvxlError> {
        let fraction = *self
            .fractions
            .get(self.next)
            .ok_or(JvxlError::EdgeCountMismatch {
                expected: self.next + 1,
                actual: self.fractions.len(),
            })?;
        self.next += 1;
        Ok((fraction, self.value))
    }
}

/// Output of one walk. `edge_fractions[v]` is the fraction that produced vertex `v`.
#[derive(Debug, Clone, Default)]
pub struct MarchResult {
    pub mesh: Mesh,
    pub edge_fractions: Vec<f32>,
    pub run_lengths: Vec<u32>,
}

impl MarchResult {
    /// Number of run-length integers, written into the definition line.
    pub fn surface_int_count(&self) -> usize {
        self.run_lengths.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarchingCubes {
    pub cutoff: f32,
    pub is_absolute: bool,
    pub walk_order: WalkOrder,
}

impl MarchingCubes {
    pub fn new(cutoff: f32, is_absolute: bool, walk_order: WalkOrder) -> Self {
        Self {
            cutoff,
            is_absolute,
            walk_order,
        }
    }

    /// Extracts the isosurface from raw samples. For absolute cutoffs, triangles spanning the
    /// nodal boundary are removed afterwards.
    pub fn march_volume(&self, volume: &VolumeData) -> MarchResult {
        self.march_volume_observed(volume, || {})
    }

    /// [`march_volume`](Self::march_volume), calling `on_slab` after each x-slab of cells.
    pub fn march_volume_observed(
        &self,
        volume: &VolumeData,
        on_slab: impl FnMut(),
    ) -> MarchResult {
        let inside = InsideGrid::from_volume(volume, self.cutoff, self.is_absolute);
        let mut source = VoxelCrossings {
            volume,
            cutoff: self.cutoff,
            is_absolute: self.is_absolute,
        };
        let walked = self.walk_observed(&volume.lattice(), &inside, &mut source, on_slab);
        let mut result = match walked {
            Ok(result) => result,
            Err(never) => match never {},
        };
        if self.is_absolute {
            let dropped = result.mesh.retain_sign_consistent();
            debug!("Sign filter dropped {} triangles", dropped);
        }
        result
    }

    /// Rebuilds a surface from its encoded run lengths and edge characters. Every vertex gets
    /// the cutoff as its value until colors are applied. The walk follows the order recorded
    /// in `surface`, whatever `self.walk_order` says.
    pub fn decode(
        &self,
        lattice: &Lattice,
        surface: &JvxlSurface,
        encoding: &FractionEncoding,
    ) -> Result<MarchResult, JvxlError> {
        self.decode_observed(lattice, surface, encoding, || {})
    }

    /// [`decode`](Self::decode), calling `on_slab` after each x-slab of cells.
    pub fn decode_observed(
        &self,
        lattice: &Lattice,
        surface: &JvxlSurface,
        encoding: &FractionEncoding,
        on_slab: impl FnMut(),
    ) -> Result<MarchResult, JvxlError> {
        let cubes = Self {
            walk_order: surface.walk_order,
            ..*self
        };
        let inside =
            InsideGrid::from_run_lengths(lattice.counts, cubes.walk_order, &surface.run_lengths)?;
        let mut source = EncodedCrossings::new(surface.edge_fractions(encoding)?, cubes.cutoff);
        let result = cubes.walk_observed(lattice, &inside, &mut source, on_slab)?;
        if source.consumed() != source.available() {
            return Err(JvxlError::EdgeCountMismatch {
                expected: source.consumed(),
                actual: source.available(),
            });
        }
        Ok(result)
    }

    /// Visits every cell in walk order. Each crossing edge becomes exactly one vertex, shared
    /// by every cell around it; vertices are created in cell edge order.
    pub fn walk<S: CrossingSource>(
        &self,
        lattice: &Lattice,
        inside: &InsideGrid,
        source: &mut S,
    ) -> Result<MarchResult, S::Error> {
        self.walk_observed(lattice, inside, source, || {})
    }

    pub fn walk_observed<S: CrossingSource>(
        &self,
        lattice: &Lattice,
        inside: &InsideGrid,
        source: &mut S,
        mut on_slab: impl FnMut(),
    ) -> Result<MarchResult, S::Error> {
        let mut result = MarchResult {
            run_lengths: inside.run_lengths(self.walk_order),
            ..MarchResult::default()
        };
        let [nx, ny, nz] = lattice.counts;
        if nx < 2 || ny < 2 || nz < 2 {
            return Ok(result);
        }

        let mut memo = vec![[NO_VERTEX; 3]; lattice.point_count()];
        let cells: Box<dyn Iterator<Item = usize>> = match self.walk_order {
            WalkOrder::Ascending => Box::new(0..nx - 1),
            WalkOrder::Descending => Box::new((0..nx - 1).rev()),
        };

        for i in cells {
            for j in 0..ny - 1 {
                for k in 0..nz - 1 {
                    let mut config = 0u8;
                    for (corner, offset) in CORNER_OFFSETS.iter().enumerate() {
                        if !inside.get([i + offset[0], j + offset[1], k + offset[2]]) {
                            config |= 1 << corner;
                        }
                    }
                    if config == 0 || config == 255 {
                        continue;
                    }

                    let mut cell_vertices = [NO_VERTEX; 12];
                    for edge in 0..12 {
                        let (a, b) = EDGE_CORNERS[edge];
                        if (config >> a) & 1 == (config >> b) & 1 {
                            continue;
                        }
                        let offset = CORNER_OFFSETS[a];
                        let from = [i + offset[0], j + offset[1], k + offset[2]];
                        let axis = EDGE_AXIS[edge];
                        let slot = &mut memo[lattice.index(from[0], from[1], from[2])][axis];
                        if *slot == NO_VERTEX {
                            let (fraction, value) = source.crossing(from, axis)?;
                            let position = lattice.point_at(from[0], from[1], from[2])
                                + lattice.vectors[axis] * fraction as f64;
                            *slot = result.mesh.add_vertex(position, value);
                            result.edge_fractions.push(fraction);
                        }
                        cell_vertices[edge] = *slot;
                    }

                    for t in 0..triangle_count(config) {
                        let [e0, e1, e2] = triangle_edges(config, t);
                        let mut check = 0;
                        if EDGE_FACES[e0] & EDGE_FACES[e1] != 0 {
                            check |= EDGE_AB;
                        }
                        if EDGE_FACES[e1] & EDGE_FACES[e2] != 0 {
                            check |= EDGE_BC;
                        }
                        if EDGE_FACES[e2] & EDGE_FACES[e0] != 0 {
                            check |= EDGE_CA;
                        }
                        result.mesh.add_triangle(
                            [cell_vertices[e0], cell_vertices[e1], cell_vertices[e2]],
                            check,
                        );
                    }
                }
            }
            on_slab();
        }

        trace!(
            "Walk produced {} vertices, {} triangles, {} run lengths",
            result.mesh.vertex_count(),
            result.mesh.triangle_count(),
            result.run_lengths.len()
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::jvxl::writer::{SurfaceEncoder, SurfaceKind};
    use nalgebra::{Point3, Vector3};
    use std::collections::HashSet;

    fn grid(counts: [usize; 3], f: impl Fn(f64, f64, f64) -> f32) -> VolumeData {
        let mut values = Vec::new();
        for i in 0..counts[0] {
            for j in 0..counts[1] {
                for k in 0..counts[2] {
                    values.push(f(i as f64, j as f64, k as f64));
                }
            }
        }
        VolumeData::new(
            Point3::origin(),
            [Vector3::x(), Vector3::y(), Vector3::z()],
            counts,
            values,
        )
        .unwrap()
    }

    fn sphere(n: usize, radius: f64) -> VolumeData {
        let c = (n - 1) as f64 / 2.0;
        grid([n, n, n], |x, y, z| {
            (radius - ((x - c).powi(2) + (y - c).powi(2) + (z - c).powi(2)).sqrt()) as f32
        })
    }

    fn crossing_edge_count(volume: &VolumeData, cutoff: f32) -> usize {
        let [nx, ny, nz] = volume.counts();
        let mut count = 0;
        for i in 0..nx {
            for j in 0..ny {
                for k in 0..nz {
                    let here = volume.value_at(i, j, k) >= cutoff;
                    for [di, dj, dk] in [[1, 0, 0], [0, 1, 0], [0, 0, 1]] {
                        if let Some(v) = volume.get(i + di, j + dj, k + dk) {
                            if (v >= cutoff) != here {
                                count += 1;
                            }
                        }
                    }
                }
            }
        }
        count
    }

    #[test]
    fn edge_fraction_interpolates_linearly() {
        assert_eq!(edge_fraction(0.0, 10.0, 5.0, false), 0.5);
        assert!(edge_fraction(0.0, 1.0, 5.0, false).is_nan());
    }

    #[test]
    fn absolute_fraction_retries_negative_cutoff() {
        let f = edge_fraction(-0.5, 0.1, 0.3, true);
        assert!((f - 1.0 / 3.0).abs() < 1e-6);
        assert!(edge_fraction(-0.5, 0.1, 0.3, false).is_nan());
    }

    #[test]
    fn inside_test_honors_absolute_mode() {
        assert!(is_inside(-0.5, 0.3, true));
        assert!(!is_inside(-0.5, 0.3, false));
        assert!(!is_inside(f32::NAN, 0.3, true));
    }

    #[test]
    fn center_spike_gives_closed_octahedron() {
        let volume = grid([3, 3, 3], |x, y, z| {
            if (x, y, z) == (1.0, 1.0, 1.0) { 10.0 } else { 0.0 }
        });
        let result = MarchingCubes::new(5.0, false, WalkOrder::Ascending).march_volume(&volume);
        assert_eq!(result.mesh.vertex_count(), 6);
        assert_eq!(result.mesh.triangle_count(), 8);
        assert_eq!(result.mesh.boundary_edge_count(), 0);
        for p in result.mesh.vertices() {
            let distance = (p - Point3::new(1.0, 1.0, 1.0)).norm();
            assert!((distance - 0.5).abs() < 1e-9);
        }
    }

    #[test]
    fn vertex_count_equals_crossing_edges() {
        let volume = sphere(12, 3.7);
        let result = MarchingCubes::new(0.0, false, WalkOrder::Ascending).march_volume(&volume);
        assert_eq!(result.mesh.vertex_count(), crossing_edge_count(&volume, 0.0));
        assert_eq!(result.edge_fractions.len(), result.mesh.vertex_count());
    }

    #[test]
    fn shared_edges_are_not_duplicated() {
        let volume = sphere(10, 3.1);
        let result = MarchingCubes::new(0.0, false, WalkOrder::Ascending).march_volume(&volume);
        let positions: HashSet<[u64; 3]> = result
            .mesh
            .vertices()
            .iter()
            .map(|p| [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()])
            .collect();
        assert_eq!(positions.len(), result.mesh.vertex_count());
    }

    #[test]
    fn descending_walk_produces_same_surface_size() {
        let volume = sphere(9, 2.9);
        let up = MarchingCubes::new(0.0, false, WalkOrder::Ascending).march_volume(&volume);
        let down = MarchingCubes::new(0.0, false, WalkOrder::Descending).march_volume(&volume);
        assert_eq!(up.mesh.vertex_count(), down.mesh.vertex_count());
        assert_eq!(up.mesh.triangle_count(), down.mesh.triangle_count());
        assert!((up.mesh.surface_area() - down.mesh.surface_area()).abs() < 1e-9);
    }

    #[test]
    fn run_lengths_cover_every_point() {
        let volume = sphere(7, 2.2);
        let result = MarchingCubes::new(0.0, false, WalkOrder::Descending).march_volume(&volume);
        let total: u32 = result.run_lengths.iter().sum();
        assert_eq!(total as usize, volume.point_count());
        let restored =
            InsideGrid::from_run_lengths(volume.counts(), WalkOrder::Descending, &result.run_lengths)
                .unwrap();
        assert_eq!(restored, InsideGrid::from_volume(&volume, 0.0, false));
    }

    #[test]
    fn decode_replays_the_encoded_walk() {
        let volume = sphere(10, 3.3);
        let mc = MarchingCubes::new(0.0, false, WalkOrder::Ascending);
        let original = mc.march_volume(&volume);
        let encoding = FractionEncoding::default();
        let surface = SurfaceEncoder {
            kind: SurfaceKind::Plain,
            cutoff: 0.0,
            run_lengths: &original.run_lengths,
            edge_fractions: &original.edge_fractions,
            colors: None,
            walk_order: WalkOrder::Ascending,
            info: String::new(),
        }
        .encode(&encoding, &encoding);
        let decoded = mc.decode(&volume.lattice(), &surface, &encoding).unwrap();
        assert_eq!(decoded.mesh.vertex_count(), original.mesh.vertex_count());
        assert_eq!(decoded.mesh.triangles(), original.mesh.triangles());
        for (a, b) in decoded.mesh.vertices().iter().zip(original.mesh.vertices()) {
            assert!((a - b).norm() <= 1.0 / 90.0 + 1e-6);
        }
    }

    #[test]
    fn reports_one_step_per_slab() {
        let volume = sphere(7, 2.0);
        let mut slabs = 0;
        let result = MarchingCubes::new(0.0, false, WalkOrder::Descending)
            .march_volume_observed(&volume, || slabs += 1);
        assert_eq!(slabs, 6);
        assert!(result.mesh.triangle_count() > 0);
    }

    #[test]
    fn decode_follows_the_recorded_walk_order() {
        let volume = sphere(8, 2.5);
        let down = MarchingCubes::new(0.0, false, WalkOrder::Descending);
        let original = down.march_volume(&volume);
        let encoding = FractionEncoding::default();
        let surface = SurfaceEncoder {
            kind: SurfaceKind::Plain,
            cutoff: 0.0,
            run_lengths: &original.run_lengths,
            edge_fractions: &original.edge_fractions,
            colors: None,
            walk_order: WalkOrder::Descending,
            info: String::new(),
        }
        .encode(&encoding, &encoding);
        let up = MarchingCubes::new(0.0, false, WalkOrder::Ascending);
        let decoded = up.decode(&volume.lattice(), &surface, &encoding).unwrap();
        assert_eq!(decoded.mesh.triangles(), original.mesh.triangles());
        for (a, b) in decoded.mesh.vertices().iter().zip(original.mesh.vertices()) {
            assert!((a - b).norm() <= 1.0 / 90.0 + 1e-6);
        }
    }

    #[test]
    fn decode_rejects_short_edge_stream() {
        let volume = sphere(6, 2.0);
        let mc = MarchingCubes::new(0.0, false, WalkOrder::Ascending);
        let original = mc.march_volume(&volume);
        let encoding = FractionEncoding::default();
        let mut surface = SurfaceEncoder {
            kind: SurfaceKind::Plain,
            cutoff: 0.0,
            run_lengths: &original.run_lengths,
            edge_fractions: &original.edge_fractions,
            colors: None,
            walk_order: WalkOrder::Ascending,
            info: String::new(),
        }
        .encode(&encoding, &encoding);
        surface.edge_data.pop();
        assert!(matches!(
            mc.decode(&volume.lattice(), &surface, &encoding),
            Err(JvxlError::EdgeCountMismatch { .. })
        ));
        surface.edge_data.push_str("##");
        assert!(matches!(
            mc.decode(&volume.lattice(), &surface, &encoding),
            Err(JvxlError::EdgeCountMismatch { .. })
        ));
    }

    #[test]
    fn absolute_surface_has_no_sign_mixed_triangles() {
        let volume = grid([10, 10, 10], |x, y, z| {
            let (x, y, z) = (x - 4.5, y - 4.5, z - 4.5);
            (x * (-(x * x + y * y + z * z) / 8.0).exp()) as f32
        });
        let result = MarchingCubes::new(0.2, true, WalkOrder::Ascending).march_volume(&volume);
        assert!(result.mesh.triangle_count() > 0);
        let values = result.mesh.values();
        for t in result.mesh.triangles() {
            let signs: Vec<f32> = t.vertices.iter().map(|&v| values[v as usize]).collect();
            assert!(
                !(signs.iter().any(|&v| v > 0.0) && signs.iter().any(|&v| v < 0.0)),
                "mixed triangle {signs:?}"
            );
        }
    }

    #[test]
    fn grids_thinner_than_one_cell_are_empty() {
        let volume = grid([1, 4, 4], |_, _, _| 1.0);
        let result = MarchingCubes::new(0.5, false, WalkOrder::Ascending).march_volume(&volume);
        assert!(result.mesh.is_empty());
        assert_eq!(result.run_lengths, vec![0, 16]);
    }
}
