use nalgebra::Point3;
use std::collections::HashMap;

use crate::core::utils::geometry::triangle_area;

/// Edge flag for the side joining vertex 0 and vertex 1 of a triangle.
pub const EDGE_AB: u8 = 0b001;
/// Edge flag for the side joining vertex 1 and vertex 2.
pub const EDGE_BC: u8 = 0b010;
/// Edge flag for the side joining vertex 2 and vertex 0.
pub const EDGE_CA: u8 = 0b100;

/// A triangle referencing three mesh vertices.
///
/// `check` marks which sides lie on a face of their marching-cubes cell. Renderers use it to
/// draw cell-boundary lines; interior diagonals stay unmarked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triangle {
    pub vertices: [u32; 3],
    pub check: u8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshStats {
    pub vertex_count: usize,
    pub triangle_count: usize,
    pub area: f64,
    pub boundary_edges: usize,
}

/// Triangulated isosurface: positions, per-vertex scalar values, and optional per-vertex
/// color indices and connected-component ids.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    vertices: Vec<Point3<f64>>,
    values: Vec<f32>,
    triangles: Vec<Triangle>,
    color_indices: Option<Vec<u16>>,
    vertex_sets: Option<Vec<u32>>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, position: Point3<f64>, value: f32) -> u32 {
        self.vertices.push(position);
        self.values.push(value);
        (self.vertices.len() - 1) as u32
    }

    /// Appends a triangle unless one of its vertices has a NaN position or value.
    /// Returns whether the triangle was kept.
    pub fn add_triangle(&mut self, vertices: [u32; 3], check: u8) -> bool {
        let usable = vertices.iter().all(|&v| {
            let v = v as usize;
            v < self.vertices.len()
                && !self.values[v].is_nan()
                && self.vertices[v].iter().all(|c| !c.is_nan())
        });
        if usable {
            self.triangles.push(Triangle { vertices, check });
        }
        usable
    }

    pub fn vertices(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Replaces per-vertex values, e.g. after mapping a property volume onto the surface.
    pub fn set_values(&mut self, values: Vec<f32>) {
        debug_assert_eq!(values.len(), self.vertices.len());
        self.values = values;
    }

    pub fn color_indices(&self) -> Option<&[u16]> {
        self.color_indices.as_deref()
    }

    pub fn set_color_indices(&mut self, colors: Option<Vec<u16>>) {
        self.color_indices = colors;
    }

    /// Connected-component id per vertex, once surface sets have been computed.
    pub fn vertex_sets(&self) -> Option<&[u32]> {
        self.vertex_sets.as_deref()
    }

    pub fn set_vertex_sets(&mut self, sets: Option<Vec<u32>>) {
        self.vertex_sets = sets;
    }

    /// Drops every triangle that has both a strictly positive and a strictly negative vertex
    /// value, returning how many were removed.
    pub fn retain_sign_consistent(&mut self) -> usize {
        let before = self.triangles.len();
        let values = &self.values;
        self.triangles.retain(|t| {
            let mut positive = false;
            let mut negative = false;
            for &v in &t.vertices {
                let value = values[v as usize];
                positive |= value > 0.0;
                negative |= value < 0.0;
            }
            !(positive && negative)
        });
        before - self.triangles.len()
    }

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

    pub fn surface_area(&self) -> f64 {
        self.triangles
            .iter()
            .map(|t| {
                let [a, b, c] = t.vertices.map(|v| &self.vertices[v as usize]);
                triangle_area(a, b, c)
            })
            .sum()
    }

    /// Number of undirected edges used by exactly one triangle. Zero for a closed surface.
    pub fn boundary_edge_count(&self) -> usize {
        let mut uses: HashMap<(u32, u32), u32> = HashMap::new();
        for t in &self.triangles {
            let [a, b, c] = t.vertices;
            for (p, q) in [(a, b), (b, c), (c, a)] {
                *uses.entry((p.min(q), p.max(q))).or_default() += 1;
            }
        }
        uses.values().filter(|&&n| n == 1).count()
    }

    pub fn stats(&self) -> MeshStats {
        MeshStats {
            vertex_count: self.vertex_count(),
            triangle_count: self.triangle_count(),
            area: self.surface_area(),
            boundary_edges: self.boundary_edge_count(),
        }
    }
}
