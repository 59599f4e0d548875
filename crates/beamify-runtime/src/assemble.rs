use beamify_cover::{Assignment, CoverModel};
use beamify_field::{Coord, MAX_BEAM_LENGTH, VoxelField};

/// Paints solved blobs of one pass into a label field with pass-unique group ids.
#[derive(Clone, Debug)]
pub struct PassAssembler {
    labels: VoxelField,
    next_id: u32,
}

impl PassAssembler {
    pub fn new(like: &VoxelField) -> Self {
        Self {
            labels: like.empty_like(),
            next_id: 1,
        }
    }

    /// Writes one id per selected placement, in ascending column order.
    pub fn paint(&mut self, model: &CoverModel, assignment: &Assignment) {
        let mut selected = assignment.selected.clone();
        selected.sort_unstable();
        for v in selected {
            let (anchor, cfg) = model.decode(v);
            let id = self.next_id;
            self.next_id += 1;
            for c in cfg.cells(anchor) {
                self.labels.set(c, id);
            }
        }
    }

    /// Number of groups painted so far.
    #[inline]
    pub fn groups_painted(&self) -> u32 {
        self.next_id - 1
    }

    pub fn finish(self) -> VoxelField {
        self.labels
    }
}

/// Cell sets of every group with exactly four cells, in ascending id order.
pub fn completed_beams(labels: &VoxelField) -> Vec<Vec<Coord>> {
    labels
        .groups()
        .into_values()
        .filter(|cells| cells.len() == MAX_BEAM_LENGTH)
        .collect()
}
