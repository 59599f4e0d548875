use beamify_field::{Beam, VoxelField, beams_of};

/// Final beam assignment: group ids per cell plus the material field they were carved from.
#[derive(Clone, Debug)]
pub struct LabeledField {
    pub labels: VoxelField,
    pub materials: VoxelField,
}

impl LabeledField {
    pub fn beams(&self) -> Vec<Beam> {
        beams_of(&self.labels, &self.materials)
    }

    pub fn group_count(&self) -> usize {
        self.labels.materials().len()
    }

    /// Every material cell carries a label and every label sits on a material cell.
    pub fn covers_materials(&self) -> bool {
        self.labels.dims() == self.materials.dims()
            && self
                .labels
                .iter_occupied()
                .all(|(c, _)| self.materials.get(c) != 0)
            && self
                .materials
                .iter_occupied()
                .all(|(c, _)| self.labels.get(c) != 0)
    }
}
