#![allow(dead_code)]

use molsurf::core::models::backbone::{BackboneAtoms, Chain, Residue};
use molsurf::core::models::volume::VolumeData;
use nalgebra::{Point3, Vector3};

/// Unit-spaced grid at the origin, filled from `f(i, j, k)`.
pub fn grid(counts: [usize; 3], f: impl Fn(f64, f64, f64) -> f32) -> VolumeData {
    let mut values = Vec::with_capacity(counts.iter().product());
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

pub fn gaussian_sphere(n: usize) -> VolumeData {
    let c = (n as f64 - 1.0) / 2.0;
    grid([n, n, n], |x, y, z| {
        let r2 = (x - c).powi(2) + (y - c).powi(2) + (z - c).powi(2);
        (-r2 / 8.0).exp() as f32
    })
}

/// A p-like orbital: positive lobe at +x, negative lobe at -x.
pub fn p_orbital(n: usize) -> VolumeData {
    let c = (n as f64 - 1.0) / 2.0;
    grid([n, n, n], |x, y, z| {
        let (dx, dy, dz) = (x - c, y - c, z - c);
        let r2 = dx * dx + dy * dy + dz * dz;
        (dx * (-r2 / 6.0).exp()) as f32
    })
}

pub fn spike() -> VolumeData {
    grid([3, 3, 3], |x, y, z| {
        if (x, y, z) == (1.0, 1.0, 1.0) { 10.0 } else { 0.0 }
    })
}

fn place(
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
    length: f64,
    angle: f64,
    torsion: f64,
) -> Point3<f64> {
    let bc = (c - b).normalize();
    let n = (b - a).cross(&bc).normalize();
    let m = n.cross(&bc);
    let (angle, torsion) = (angle.to_radians(), torsion.to_radians());
    c + bc * (-length * angle.cos())
        + m * (length * angle.sin() * torsion.cos())
        + n * (length * angle.sin() * torsion.sin())
}

/// CA-only trace with 3.8 A steps and a constant virtual torsion.
pub fn ca_trace(count: usize, torsion: f64) -> Chain {
    let bend = (180.0f64 - 91.0).to_radians();
    let mut points = vec![
        Point3::origin(),
        Point3::new(3.8, 0.0, 0.0),
        Point3::new(3.8 + 3.8 * bend.cos(), 3.8 * bend.sin(), 0.0),
    ];
    while points.len() < count {
        let n = points.len();
        let next = place(&points[n - 3], &points[n - 2], &points[n - 1], 3.8, 91.0, torsion);
        points.push(next);
    }
    let mut chain = Chain::new('A');
    for (i, ca) in points.into_iter().take(count).enumerate() {
        chain.push(Residue::new(i as isize + 1, "ALA", ca));
    }
    chain
}

/// Ideal alpha helix with N, CA, C and O on every residue.
pub fn alpha_helix(count: usize) -> Chain {
    let bend = (180.0f64 - 111.2).to_radians();
    let ca0 = Point3::new(1.458, 0.0, 0.0);
    let mut atoms = vec![(
        Point3::origin(),
        ca0,
        ca0 + Vector3::new(bend.cos(), bend.sin(), 0.0) * 1.525,
    )];
    while atoms.len() < count {
        let (pn, pca, pc) = *atoms.last().unwrap();
        let n = place(&pn, &pca, &pc, 1.329, 116.2, -47.0);
        let ca = place(&pca, &pc, &n, 1.458, 121.7, 180.0);
        let c = place(&pc, &n, &ca, 1.525, 111.2, -57.0);
        atoms.push((n, ca, c));
    }
    let mut chain = Chain::new('A');
    for (i, (n, ca, c)) in atoms.into_iter().enumerate() {
        let o = place(&n, &ca, &c, 1.231, 120.5, 133.0);
        chain.push(Residue::new(i as isize + 1, "ALA", ca).with_backbone(BackboneAtoms { n, c, o }));
    }
    chain
}
