//! Backbone hydrogen bonds from an electrostatic N-H...O=C energy, and the helix and
//! sheet patterns they form.

use crate::core::models::backbone::PolymerBackbone;
use crate::core::models::structure::StructureType;
use crate::engine::config::StructureConfig;
use nalgebra::Point3;
use tracing::{debug, info};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Product of the partial charges on the amide and carbonyl groups, times 332 kcal A/mol,
/// scaled by 1000.
const Q: f64 = -332.0 * 0.42 * 0.2 * 1000.0;
/// Energy returned for geometries closer than the minimum atom distance.
pub const SATURATED_ENERGY: i32 = -9900;
/// Energies weaker than this are not bonds.
pub const BOND_THRESHOLD: i32 = -500;

/// Energy of the bond between a donor amide (`nitrogen`, `hydrogen`) and an acceptor
/// carbonyl (`carbon`, `oxygen`). Zero means no bond.
pub fn hbond_energy(
    nitrogen: &Point3<f64>,
    hydrogen: &Point3<f64>,
    carbon: &Point3<f64>,
    oxygen: &Point3<f64>,
    min_distance: f64,
) -> i32 {
    let oh = (oxygen - hydrogen).norm();
    let ch = (carbon - hydrogen).norm();
    let cn = (carbon - nitrogen).norm();
    let on = (oxygen - nitrogen).norm();
    if [oh, ch, cn, on].iter().any(|&d| d < min_distance) {
        return SATURATED_ENERGY;
    }
    let energy = (Q / oh - Q / ch + Q / cn - Q / on) as i32;
    if energy < SATURATED_ENERGY {
        SATURATED_ENERGY
    } else if energy > BOND_THRESHOLD {
        0
    } else {
        energy
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HydrogenBond {
    pub donor: usize,
    pub acceptor: usize,
    pub energy: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeKind {
    Parallel,
    Antiparallel,
}

/// Two residues paired across a beta ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bridge {
    pub kind: BridgeKind,
    pub first: usize,
    pub second: usize,
}

/// The best and second-best acceptor of every donor residue.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HydrogenBondTable {
    acceptors: Vec<[Option<HydrogenBond>; 2]>,
}

impl HydrogenBondTable {
    pub fn len(&self) -> usize {
        self.acceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.acceptors.is_empty()
    }

    pub fn bonds(&self) -> impl Iterator<Item = &HydrogenBond> {
        self.acceptors.iter().flatten().flatten()
    }

    pub fn best(&self, donor: usize) -> Option<&HydrogenBond> {
        self.acceptors.get(donor).and_then(|pair| pair[0].as_ref())
    }

    /// Whether `donor`'s N-H binds the carbonyl of `acceptor`.
    pub fn is_bonded(&self, donor: usize, acceptor: usize) -> bool {
        self.acceptors
            .get(donor)
            .is_some_and(|pair| pair.iter().flatten().any(|b| b.acceptor == acceptor))
    }

    /// Donor-minus-acceptor offset of each donor's strongest bond.
    pub fn best_offsets(&self) -> Vec<Option<isize>> {
        (0..self.len())
            .map(|i| self.best(i).map(|b| b.donor as isize - b.acceptor as isize))
            .collect()
    }
}

/// Amide hydrogen placed 1 A from the nitrogen, along the preceding carbonyl's O to C direction.
fn amide_hydrogen(backbone: &impl PolymerBackbone, index: usize) -> Option<Point3<f64>> {
    if index == 0 || backbone.is_proline(index) {
        return None;
    }
    let atoms = backbone.backbone_atoms(index)?;
    let previous = backbone.backbone_atoms(index - 1)?;
    let direction = (previous.c - previous.o).try_normalize(1e-9)?;
    Some(atoms.n + direction)
}

fn best_acceptors(
    backbone: &(impl PolymerBackbone + Sync),
    donor: usize,
    config: &StructureConfig,
) -> [Option<HydrogenBond>; 2] {
    let mut found: [Option<HydrogenBond>; 2] = [None, None];
    let (Some(hydrogen), Some(atoms)) = (
        amide_hydrogen(backbone, donor),
        backbone.backbone_atoms(donor),
    ) else {
        return found;
    };
    let donor_lead = backbone.lead_atom(donor);

    for acceptor in 0..backbone.residue_count() {
        if acceptor == donor || acceptor + 1 == donor {
            continue;
        }
        if (backbone.lead_atom(acceptor) - donor_lead).norm() >= config.hbond_ca_cutoff {
            continue;
        }
        let Some(target) = backbone.backbone_atoms(acceptor) else {
            continue;
        };
        let energy = hbond_energy(
            &atoms.n,
            &hydrogen,
            &target.c,
            &target.o,
            config.min_atom_distance,
        );
        if energy >= 0 {
            continue;
        }
        let bond = HydrogenBond {
            donor,
            acceptor,
            energy,
        };
        match found {
            [None, _] => found[0] = Some(bond),
            [Some(best), _] if energy < best.energy => {
                found[1] = found[0];
                found[0] = Some(bond);
            }
            [_, None] => found[1] = Some(bond),
            [_, Some(second)] if energy < second.energy => found[1] = Some(bond),
            _ => {}
        }
    }
    found
}

/// Scans every donor against every acceptor within the alpha-carbon cutoff.
pub fn calculate_hbonds(
    backbone: &(impl PolymerBackbone + Sync),
    config: &StructureConfig,
) -> HydrogenBondTable {
    let count = backbone.residue_count();

    #[cfg(not(feature = "parallel"))]
    let donors = 0..count;

    #[cfg(feature = "parallel")]
    let donors = (0..count).into_par_iter();

    let acceptors: Vec<[Option<HydrogenBond>; 2]> = donors
        .map(|donor| best_acceptors(backbone, donor, config))
        .collect();

    let table = HydrogenBondTable { acceptors };
    debug!("Found {} backbone hydrogen bonds", table.bonds().count());
    table
}

/// Tags runs of at least `min_run` donors whose strongest bond reaches back `pitch` residues.
pub fn tag_pitch_runs(
    table: &HydrogenBondTable,
    pitch: usize,
    min_run: usize,
    tags: &mut [StructureType],
) {
    let min_run = min_run.max(1);
    let mut run = 0;
    for (i, offset) in table.best_offsets().into_iter().enumerate() {
        if offset == Some(pitch as isize) {
            run += 1;
            if run == min_run {
                tags[i + 1 - min_run..=i].fill(StructureType::Helix);
            } else if run > min_run {
                tags[i] = StructureType::Helix;
            }
        } else {
            run = 0;
        }
    }
}

/// Finds beta bridges from reciprocal bond patterns. Detections are logged and returned but
/// never turned into sheet segments.
pub fn find_bridges(table: &HydrogenBondTable) -> Vec<Bridge> {
    let count = table.len();
    // carbonyl of `a` accepts from the amide of `b`
    let hb = |a: usize, b: usize| table.is_bonded(b, a);
    let mut bridges = Vec::new();
    for i in 1..count.saturating_sub(1) {
        for j in (i + 3)..count.saturating_sub(1) {
            let parallel = (hb(i - 1, j) && hb(j, i + 1)) || (hb(j - 1, i) && hb(i, j + 1));
            let antiparallel = (hb(i, j) && hb(j, i)) || (hb(i - 1, j + 1) && hb(j - 1, i + 1));
            let kind = if parallel {
                BridgeKind::Parallel
            } else if antiparallel {
                BridgeKind::Antiparallel
            } else {
                continue;
            };
            info!("{kind:?} bridge found between residues {i} and {j}");
            bridges.push(Bridge {
                kind,
                first: i,
                second: j,
            });
        }
    }
    bridges
}
