use serde::{Deserialize, Serialize};

use crate::catalog::MAX_BEAM_LENGTH;
use crate::coord::{Axis, Coord};
use crate::field::VoxelField;

/// A contiguous axis-aligned run of 1..=4 cells sharing one group id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Beam {
    pub id: u32,
    pub origin: Coord,
    /// `None` for single cells.
    pub axis: Option<Axis>,
    pub length: usize,
    /// Material value the beam was carved from (0 when unknown).
    pub material: u32,
}

impl Beam {
    /// Interprets a group's cells as a beam. Returns `None` unless the cells form one
    /// collinear, gap-free run of at most four cells.
    pub fn from_cells(id: u32, cells: &[Coord]) -> Option<Beam> {
        if cells.is_empty() || cells.len() > MAX_BEAM_LENGTH {
            return None;
        }
        let mut sorted = cells.to_vec();
        sorted.sort();
        let origin = sorted[0];
        if sorted.len() == 1 {
            return Some(Beam {
                id,
                origin,
                axis: None,
                length: 1,
                material: 0,
            });
        }
        let axis = Axis::ALL
            .into_iter()
            .find(|a| sorted[1] == origin.forward(*a, 1))?;
        let contiguous = sorted
            .iter()
            .enumerate()
            .all(|(k, c)| *c == origin.forward(axis, k));
        contiguous.then_some(Beam {
            id,
            origin,
            axis: Some(axis),
            length: sorted.len(),
            material: 0,
        })
    }

    /// Cells covered by the beam, origin first.
    pub fn cells(&self) -> impl Iterator<Item = Coord> + '_ {
        let axis = self.axis.unwrap_or(Axis::X);
        (0..self.length).map(move |k| self.origin.forward(axis, k))
    }
}

/// Reads every group of `labels` as a beam, tagging each with the material found under its
/// origin in `materials`. Groups that are not valid beams are skipped.
pub fn beams_of(labels: &VoxelField, materials: &VoxelField) -> Vec<Beam> {
    labels
        .groups()
        .into_iter()
        .filter_map(|(id, cells)| {
            let mut beam = Beam::from_cells(id, &cells)?;
            beam.material = materials.get(beam.origin);
            Some(beam)
        })
        .collect()
}
