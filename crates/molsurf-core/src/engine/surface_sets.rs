use crate::core::models::mesh::{Mesh, Triangle};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Most sets tracked at once during a scan.
pub const MAX_SETS: usize = 100;
/// Extra scans allowed after the first one overflows.
pub const MAX_RETRIES: usize = 2;
/// Set id of vertices no triangle references.
pub const NO_SET: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSetSummary {
    pub set_count: usize,
    pub retries: usize,
    /// The final pass ran out of slots and merged unrelated pieces into existing sets.
    pub coalesced: bool,
}

type Slots = Vec<Option<HashSet<u32>>>;

fn compact(slots: Slots) -> Vec<HashSet<u32>> {
    slots.into_iter().flatten().collect()
}

/// One pass over the triangles. Each triangle joins every set that already owns one of its
/// vertices, merging those sets; a triangle touching no set starts a new one. When all slots
/// are live, the pass either gives up (returning what it has) or, if `coalesce` is set,
/// folds the triangle into the most recent set.
fn scan(
    triangles: &[Triangle],
    seeds: Vec<HashSet<u32>>,
    coalesce: bool,
) -> (Result<Vec<HashSet<u32>>, Vec<HashSet<u32>>>, bool) {
    let mut slots: Slots = seeds.into_iter().map(Some).collect();
    let mut live = slots.len();
    let mut coalesced = false;

    for triangle in triangles {
        let hits: Vec<usize> = slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| {
                slot.as_ref()
                    .is_some_and(|set| triangle.vertices.iter().any(|v| set.contains(v)))
            })
            .map(|(index, _)| index)
            .collect();

        match hits.split_first() {
            None => {
                if slots.len() >= MAX_SETS && live < slots.len() {
                    slots = compact(slots).into_iter().map(Some).collect();
                }
                if live >= MAX_SETS {
                    if !coalesce {
                        return (Err(compact(slots)), false);
                    }
                    coalesced = true;
                    if let Some(set) = slots.iter_mut().rev().flatten().next() {
                        set.extend(triangle.vertices);
                    }
                    continue;
                }
                slots.push(Some(triangle.vertices.into_iter().collect()));
                live += 1;
            }
            Some((&first, others)) => {
                let mut merged: Vec<u32> = triangle.vertices.to_vec();
                for &other in others {
                    if let Some(set) = slots[other].take() {
                        merged.extend(set);
                        live -= 1;
                    }
                }
                if let Some(set) = slots[first].as_mut() {
                    set.extend(merged);
                }
            }
        }
    }
    (Ok(compact(slots)), coalesced)
}

/// Labels connected pieces of the surface by scanning triangles for shared vertices, storing
/// one set id per vertex on the mesh.
///
/// The scan tracks at most [`MAX_SETS`] sets. On overflow it restarts, seeded with the sets
/// found so far, up to [`MAX_RETRIES`] times; the last attempt coalesces instead of failing,
/// so distinct pieces may occasionally share an id.
pub fn label_surface_sets(mesh: &mut Mesh) -> SurfaceSetSummary {
    let mut seeds = Vec::new();
    let mut retries = 0;
    let (sets, coalesced) = loop {
        let last_attempt = retries == MAX_RETRIES;
        match scan(mesh.triangles(), seeds, last_attempt) {
            (Ok(sets), coalesced) => break (sets, coalesced),
            (Err(partial), _) => {
                warn!(
                    "Surface set scan exceeded {} sets; retrying ({} of {})",
                    MAX_SETS,
                    retries + 1,
                    MAX_RETRIES
                );
                seeds = partial;
                retries += 1;
            }
        }
    };

    let mut ids = vec![NO_SET; mesh.vertex_count()];
    for (id, set) in sets.iter().enumerate() {
        for &vertex in set {
            if let Some(slot) = ids.get_mut(vertex as usize) {
                *slot = id as u32;
            }
        }
    }
    mesh.set_vertex_sets(Some(ids));

    debug!("Labeled {} surface sets", sets.len());
    SurfaceSetSummary {
        set_count: sets.len(),
        retries,
        coalesced,
    }
}
