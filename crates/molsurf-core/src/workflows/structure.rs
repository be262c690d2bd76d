use crate::core::models::backbone::PolymerBackbone;
use crate::engine::config::StructureConfig;
use crate::engine::structure::{StructureAssignment, classify};
use tracing::{info, instrument};

/// Classifies `backbone` and publishes every segment back onto it through
/// [`PolymerBackbone::set_structure`].
#[instrument(skip_all, name = "structure_workflow")]
pub fn assign<B>(backbone: &mut B, config: &StructureConfig) -> StructureAssignment
where
    B: PolymerBackbone + Sync,
{
    let assignment = classify(&*backbone, config);
    for segment in &assignment.segments {
        backbone.set_structure(segment);
    }
    if !assignment.bridges.is_empty() {
        info!(
            "{} beta bridges detected; sheets are not assigned from hydrogen bonds",
            assignment.bridges.len()
        );
    }
    info!(
        "Assigned {} segments over {} residues.",
        assignment.segments.len(),
        backbone.residue_count()
    );
    assignment
}
