use super::structure::{SecondaryStructureSegment, StructureType};
use nalgebra::Point3;

/// Amide nitrogen, carbonyl carbon and carbonyl oxygen of one amino-acid residue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackboneAtoms {
    pub n: Point3<f64>,
    pub c: Point3<f64>,
    pub o: Point3<f64>,
}

/// The view of a polymer chain the secondary-structure classifier needs.
///
/// Indices run N- to C-terminal and stay stable for one classification pass.
pub trait PolymerBackbone {
    fn residue_count(&self) -> usize;

    /// Lead atom position (alpha carbon for proteins).
    fn lead_atom(&self, index: usize) -> Point3<f64>;

    /// Full backbone for amino-acid residues; `None` on lead-atom-only chains.
    fn backbone_atoms(&self, index: usize) -> Option<&BackboneAtoms>;

    fn is_proline(&self, index: usize) -> bool;

    /// Publishes one classifier result back onto the chain.
    fn set_structure(&mut self, segment: &SecondaryStructureSegment);

    /// Whether every residue carries backbone atoms, enabling the hydrogen-bond tier.
    fn has_full_backbone(&self) -> bool {
        (0..self.residue_count()).all(|i| self.backbone_atoms(i).is_some())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Residue {
    pub id: isize,        // Residue sequence number from source file
    pub name: String,     // Residue name (e.g., "ALA", "PRO")
    pub ca: Point3<f64>,  // Alpha carbon
    pub backbone: Option<BackboneAtoms>,
    pub structure: StructureType,
}

impl Residue {
    pub fn new(id: isize, name: &str, ca: Point3<f64>) -> Self {
        Self {
            id,
            name: name.to_string(),
            ca,
            backbone: None,
            structure: StructureType::None,
        }
    }

    pub fn with_backbone(mut self, backbone: BackboneAtoms) -> Self {
        self.backbone = Some(backbone);
        self
    }
}

/// An ordered chain of residues together with the segments last assigned to it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Chain {
    pub id: char,
    pub(crate) residues: Vec<Residue>,
    pub(crate) segments: Vec<SecondaryStructureSegment>,
}

impl Chain {
    pub fn new(id: char) -> Self {
        Self {
            id,
            residues: Vec::new(),
            segments: Vec::new(),
        }
    }

    pub fn push(&mut self, residue: Residue) {
        self.residues.push(residue);
    }

    pub fn residues(&self) -> &[Residue] {
        &self.residues
    }

    pub fn segments(&self) -> &[SecondaryStructureSegment] {
        &self.segments
    }

    /// Forgets every assignment, ready for a fresh classification pass.
    pub fn clear_structure(&mut self) {
        self.segments.clear();
        for residue in &mut self.residues {
            residue.structure = StructureType::None;
        }
    }
}

impl PolymerBackbone for Chain {
    fn residue_count(&self) -> usize {
        self.residues.len()
    }

    fn lead_atom(&self, index: usize) -> Point3<f64> {
        self.residues[index].ca
    }

    fn backbone_atoms(&self, index: usize) -> Option<&BackboneAtoms> {
        self.residues[index].backbone.as_ref()
    }

    fn is_proline(&self, index: usize) -> bool {
        self.residues[index].name.eq_ignore_ascii_case("PRO")
    }

    fn set_structure(&mut self, segment: &SecondaryStructureSegment) {
        let end = segment.end.min(self.residues.len().saturating_sub(1));
        for residue in self.residues.iter_mut().take(end + 1).skip(segment.start) {
            residue.structure = segment.kind;
        }
        self.segments.push(*segment);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn residue(id: isize, name: &str) -> Residue {
        Residue::new(id, name, Point3::new(id as f64, 0.0, 0.0))
    }

    #[test]
    fn set_structure_tags_residues_and_records_segment() {
        let mut chain = Chain::new('A');
        for i in 0..5 {
            chain.push(residue(i, "ALA"));
        }
        chain.set_structure(&SecondaryStructureSegment::new(StructureType::Helix, 1, 3));
        let tags: Vec<_> = chain.residues().iter().map(|r| r.structure).collect();
        assert_eq!(
            tags,
            vec![
                StructureType::None,
                StructureType::Helix,
                StructureType::Helix,
                StructureType::Helix,
                StructureType::None
            ]
        );
        assert_eq!(chain.segments().len(), 1);

        chain.clear_structure();
        assert!(chain.segments().is_empty());
        assert!(chain.residues().iter().all(|r| r.structure == StructureType::None));
    }

    #[test]
    fn full_backbone_requires_every_residue() {
        let atoms = BackboneAtoms {
            n: Point3::origin(),
            c: Point3::origin(),
            o: Point3::origin(),
        };
        let mut chain = Chain::new('B');
        chain.push(residue(1, "GLY").with_backbone(atoms));
        assert!(chain.has_full_backbone());
        chain.push(residue(2, "PRO"));
        assert!(!chain.has_full_backbone());
        assert!(chain.is_proline(1));
        assert!(!chain.is_proline(0));
    }
}
