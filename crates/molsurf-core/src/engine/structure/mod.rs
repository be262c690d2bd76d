//! Secondary-structure classification.
//!
//! Every chain of four or more residues gets the Levitt-Greer pass over lead-atom torsions
//! ([`alpha`]). Chains that also carry amide and carbonyl atoms get a second pass
//! ([`hbond`]) whose pitch-4 hydrogen-bond runs are laid over the first as helix.

pub mod alpha;
pub mod hbond;

use crate::core::models::backbone::PolymerBackbone;
use crate::core::models::structure::{SecondaryStructureSegment, StructureType};
use crate::engine::config::StructureConfig;
use hbond::{Bridge, HydrogenBondTable};
use itertools::Itertools;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructureAssignment {
    /// One tag per residue.
    pub tags: Vec<StructureType>,
    pub segments: Vec<SecondaryStructureSegment>,
    /// Empty unless the hydrogen-bond pass ran.
    pub hbonds: HydrogenBondTable,
    pub bridges: Vec<Bridge>,
}

/// Collapses per-residue tags into maximal runs, dropping untagged ones.
pub fn segments_from_tags(tags: &[StructureType]) -> Vec<SecondaryStructureSegment> {
    let mut segments = Vec::new();
    let mut start = 0;
    for (kind, run) in &tags.iter().chunk_by(|t| **t) {
        let len = run.count();
        if kind != StructureType::None {
            segments.push(SecondaryStructureSegment::new(kind, start, start + len - 1));
        }
        start += len;
    }
    segments
}

pub fn classify(
    backbone: &(impl PolymerBackbone + Sync),
    config: &StructureConfig,
) -> StructureAssignment {
    let mut tags = alpha::classify(backbone);
    let mut hbonds = HydrogenBondTable::default();
    let mut bridges = Vec::new();

    if config.use_hbonds && backbone.residue_count() > 0 && backbone.has_full_backbone() {
        hbonds = hbond::calculate_hbonds(backbone, config);
        hbond::tag_pitch_runs(&hbonds, config.helix_pitch, config.min_hbond_run, &mut tags);
        bridges = hbond::find_bridges(&hbonds);
    }

    let segments = segments_from_tags(&tags);
    debug!(
        "Classified {} residues into {} segments",
        tags.len(),
        segments.len()
    );
    StructureAssignment {
        tags,
        segments,
        hbonds,
        bridges,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::models::backbone::{BackboneAtoms, Chain, Residue};
    use nalgebra::{Point3, Vector3};

    /// Places `d` so that `|cd| = length`, angle `bcd = angle` and torsion `abcd = torsion`.
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
        let local = Vector3::new(
            -length * angle.cos(),
            length * angle.sin() * torsion.cos(),
            length * angle.sin() * torsion.sin(),
        );
        c + bc * local.x + m * local.y + n * local.z
    }

    /// Lead-atom trace with 3.8 A steps, 91 degree bends and a constant torsion.
    pub(crate) fn helix_chain(count: usize, torsion: f64) -> Chain {
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

    /// Ideal alpha helix (phi -57, psi -47) with full backbone atoms.
    pub(crate) fn alpha_helix_chain(count: usize) -> Chain {
        let (phi, psi, omega) = (-57.0, -47.0, 180.0);
        let bend = (180.0f64 - 111.2).to_radians();
        let n0 = Point3::origin();
        let ca0 = Point3::new(1.458, 0.0, 0.0);
        let c0 = ca0 + Vector3::new(bend.cos(), bend.sin(), 0.0) * 1.525;
        let mut atoms = vec![(n0, ca0, c0)];
        while atoms.len() < count {
            let (pn, pca, pc) = *atoms.last().unwrap();
            let n = place(&pn, &pca, &pc, 1.329, 116.2, psi);
            let ca = place(&pca, &pc, &n, 1.458, 121.7, omega);
            let c = place(&pc, &n, &ca, 1.525, 111.2, phi);
            atoms.push((n, ca, c));
        }
        let mut chain = Chain::new('A');
        for (i, (n, ca, c)) in atoms.into_iter().enumerate() {
            let o = place(&n, &ca, &c, 1.231, 120.5, psi + 180.0);
            chain.push(
                Residue::new(i as isize + 1, "ALA", ca).with_backbone(BackboneAtoms { n, c, o }),
            );
        }
        chain
    }

    #[test]
    fn tags_collapse_into_maximal_segments() {
        use StructureType::*;
        let segments = segments_from_tags(&[None, Helix, Helix, Turn, Turn, None, Helix]);
        assert_eq!(
            segments,
            vec![
                SecondaryStructureSegment::new(Helix, 1, 2),
                SecondaryStructureSegment::new(Turn, 3, 4),
                SecondaryStructureSegment::new(Helix, 6, 6),
            ]
        );
        assert!(segments_from_tags(&[]).is_empty());
    }

    #[test]
    fn lead_atom_helix_is_one_segment() {
        let chain = helix_chain(10, 55.0);
        let result = classify(&chain, &StructureConfig::default());
        assert_eq!(
            result.segments,
            vec![SecondaryStructureSegment::new(StructureType::Helix, 0, 9)]
        );
        assert!(result.hbonds.is_empty());
    }

    #[test]
    fn full_backbone_runs_hydrogen_bond_tier() {
        let chain = alpha_helix_chain(12);
        let result = classify(&chain, &StructureConfig::default());
        assert_eq!(result.hbonds.len(), 12);
        assert!(result.tags[4..].iter().all(|t| *t == StructureType::Helix));
        assert!(result.bridges.is_empty());
    }

    #[test]
    fn hydrogen_bond_tier_can_be_disabled() {
        let chain = alpha_helix_chain(12);
        let config = StructureConfig {
            use_hbonds: false,
            ..Default::default()
        };
        let result = classify(&chain, &config);
        assert!(result.hbonds.is_empty());
    }
}
