//! Levitt-Greer assignment from lead-atom torsions alone.

use crate::core::models::backbone::PolymerBackbone;
use crate::core::models::structure::StructureType;
use crate::core::utils::geometry::torsion_degrees;
use tracing::trace;

/// Shortest run of identical torsion codes accepted as a helix.
const MIN_RUN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TorsionCode {
    None,
    RightHelix,
    BetaSheet,
    LeftHelix,
    RightTurn,
    LeftTurn,
}

impl TorsionCode {
    pub fn from_degrees(angle: f64) -> Self {
        if angle.is_nan() {
            TorsionCode::None
        } else if (10.0..120.0).contains(&angle) {
            TorsionCode::RightHelix
        } else if (120.0..=180.0).contains(&angle) || (-180.0..-90.0).contains(&angle) {
            TorsionCode::BetaSheet
        } else if (-90.0..0.0).contains(&angle) {
            TorsionCode::LeftHelix
        } else {
            TorsionCode::None
        }
    }

    fn turn_from_degrees(angle: f64) -> Self {
        if (-90.0..0.0).contains(&angle) {
            TorsionCode::LeftTurn
        } else if (0.0..90.0).contains(&angle) {
            TorsionCode::RightTurn
        } else {
            TorsionCode::None
        }
    }
}

/// Torsion at each residue `i` over lead atoms `i-2, i-1, i, i+1`; NaN where undefined.
pub fn lead_torsions(backbone: &impl PolymerBackbone) -> Vec<f64> {
    let count = backbone.residue_count();
    let mut angles = vec![f64::NAN; count];
    for i in 2..count.saturating_sub(1) {
        angles[i] = torsion_degrees(
            &backbone.lead_atom(i - 2),
            &backbone.lead_atom(i - 1),
            &backbone.lead_atom(i),
            &backbone.lead_atom(i + 1),
        );
    }
    angles
}

/// A beta code bent no further than 140 degrees inside a right-handed helix is taken as helix.
fn resolve_beta_alpha_overlap(codes: &mut [TorsionCode], angles: &[f64]) {
    let count = codes.len();
    for i in 2..count.saturating_sub(2) {
        let flanked = [i - 2, i - 1, i + 1, i + 2]
            .iter()
            .all(|&j| codes[j] == TorsionCode::RightHelix);
        if codes[i] == TorsionCode::BetaSheet && angles[i] <= 140.0 && flanked {
            trace!("Recoding residue {i} from beta to helix");
            codes[i] = TorsionCode::RightHelix;
        }
    }
}

/// Tags runs of at least four identical helical codes. Beta codes are never tagged; torsions
/// alone cannot tell a strand from an extended coil.
fn tag_runs(codes: &[TorsionCode]) -> Vec<StructureType> {
    let mut tags = vec![StructureType::None; codes.len()];
    let mut current = TorsionCode::None;
    let mut run = 0;
    for (i, &code) in codes.iter().enumerate() {
        let helical = matches!(code, TorsionCode::RightHelix | TorsionCode::LeftHelix);
        if code == current && helical {
            run += 1;
            if run == MIN_RUN {
                tags[i + 1 - MIN_RUN..=i].fill(StructureType::Helix);
            } else if run > MIN_RUN {
                tags[i] = StructureType::Helix;
            }
        } else {
            run = 1;
            current = code;
        }
    }
    tags
}

/// Grows each run one residue towards the N terminus and lets both chain ends inherit the tag
/// of their neighbor.
fn extend_runs(tags: &mut [StructureType]) {
    let count = tags.len();
    if count < 2 {
        return;
    }
    for i in 1..count.saturating_sub(MIN_RUN) {
        if tags[i] == StructureType::None && tags[i + 1] != StructureType::None {
            tags[i] = tags[i + 1];
        }
    }
    tags[0] = tags[1];
    tags[count - 1] = tags[count - 2];
}

/// Marks pairs of consecutive untagged residues whose torsions turn the same way.
fn tag_turns(tags: &mut [StructureType], angles: &[f64]) {
    let count = tags.len();
    let mut codes = vec![TorsionCode::None; count];
    for i in 2..count.saturating_sub(1) {
        if tags[i] == StructureType::None {
            codes[i] = TorsionCode::turn_from_degrees(angles[i]);
        }
    }
    for i in 0..count.saturating_sub(1) {
        if codes[i] != TorsionCode::None
            && codes[i + 1] == codes[i]
            && tags[i] == StructureType::None
            && tags[i + 1] == StructureType::None
        {
            tags[i] = StructureType::Turn;
        }
    }
}

/// Per-residue tags from lead-atom geometry. Chains shorter than four residues stay untagged.
pub fn classify(backbone: &impl PolymerBackbone) -> Vec<StructureType> {
    let count = backbone.residue_count();
    if count < 4 {
        return vec![StructureType::None; count];
    }
    let angles = lead_torsions(backbone);
    let mut codes: Vec<TorsionCode> = angles.iter().map(|&a| TorsionCode::from_degrees(a)).collect();
    resolve_beta_alpha_overlap(&mut codes, &angles);
    let mut tags = tag_runs(&codes);
    extend_runs(&mut tags);
    tag_turns(&mut tags, &angles);
    tags
}
