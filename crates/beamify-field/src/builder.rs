use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::catalog::ArmorCatalog;
use crate::coord::{Axis, Coord};
use crate::field::{FieldError, MaterialKey, VoxelField};

/// Largest extent accepted along any axis.
pub const MAX_FIELD_SPAN: i64 = 4096;

/// One placed block in world coordinates, as handed over by the blueprint reader.
///
/// Multi-cell variants extend `length - 1` cells along `axis` (+z when unset).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArmorBlock {
    pub pos: [i32; 3],
    pub block: String,
    #[serde(default)]
    pub color: u32,
    #[serde(default)]
    pub axis: Option<Axis>,
}

/// A cell occupied by a block. `owner` indexes the owning [`ArmorBlock`]; the origin cell of a
/// block is a phantom of itself.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PhantomCell {
    pub pos: [i32; 3],
    pub owner: usize,
}

impl PhantomCell {
    #[inline]
    pub fn block<'a>(&self, blocks: &'a [ArmorBlock]) -> &'a ArmorBlock {
        &blocks[self.owner]
    }
}

/// Every occupied cell of `blocks`, with lengths taken from the catalog (unknown blocks span 1).
///
/// Fails when a multi-cell block would extend past the `i32` coordinate range.
pub fn expand_phantoms(
    blocks: &[ArmorBlock],
    catalog: &ArmorCatalog,
) -> Result<Vec<PhantomCell>, FieldError> {
    let mut out = Vec::with_capacity(blocks.len());
    for (owner, b) in blocks.iter().enumerate() {
        let length = catalog.lookup(&b.block).map(|v| v.length).unwrap_or(1);
        let axis = b.axis.unwrap_or(Axis::Z).index();
        for k in 0..length as i32 {
            let mut pos = b.pos;
            pos[axis] = b.pos[axis]
                .checked_add(k)
                .ok_or_else(|| FieldError::PositionOverflow {
                    block: b.block.clone(),
                    pos: b.pos,
                })?;
            out.push(PhantomCell { pos, owner });
        }
    }
    Ok(out)
}

/// Field plus the world position of its (0,0,0) cell.
#[derive(Clone, Debug)]
pub struct BuiltField {
    pub field: VoxelField,
    pub origin: [i32; 3],
    pub family_count: u32,
}

impl BuiltField {
    #[inline]
    pub fn to_world(&self, c: Coord) -> [i32; 3] {
        [
            self.origin[0] + c.x as i32,
            self.origin[1] + c.y as i32,
            self.origin[2] + c.z as i32,
        ]
    }
}

pub struct FieldBuilder<'a> {
    catalog: &'a ArmorCatalog,
    exclude_4m_beams: bool,
    exclude_colors: BTreeSet<u32>,
}

impl<'a> FieldBuilder<'a> {
    pub fn new(catalog: &'a ArmorCatalog) -> Self {
        Self {
            catalog,
            exclude_4m_beams: false,
            exclude_colors: BTreeSet::new(),
        }
    }

    /// Leave blocks that already are 4-length beams out of the field.
    pub fn exclude_4m_beams(mut self, yes: bool) -> Self {
        self.exclude_4m_beams = yes;
        self
    }

    pub fn exclude_colors(mut self, colors: impl IntoIterator<Item = u32>) -> Self {
        self.exclude_colors.extend(colors);
        self
    }

    /// Rasterizes armor cells into a field spanning the bounding box of every block.
    pub fn build(&self, blocks: &[ArmorBlock]) -> Result<BuiltField, FieldError> {
        let cells = expand_phantoms(blocks, self.catalog)?;
        let family_count = self.catalog.family_count();
        if cells.is_empty() {
            return Ok(BuiltField {
                field: VoxelField::new(0, 0, 0),
                origin: [0; 3],
                family_count,
            });
        }

        let mut min = [i32::MAX; 3];
        let mut max = [i32::MIN; 3];
        for cell in &cells {
            for a in 0..3 {
                min[a] = min[a].min(cell.pos[a]);
                max[a] = max[a].max(cell.pos[a]);
            }
        }
        let mut dims = [0usize; 3];
        for (a, axis) in Axis::ALL.iter().enumerate() {
            let span = max[a] as i64 - min[a] as i64 + 1;
            if span > MAX_FIELD_SPAN {
                return Err(FieldError::SpanTooLarge {
                    axis: axis.as_char(),
                    span,
                    limit: MAX_FIELD_SPAN,
                });
            }
            dims[a] = span as usize;
        }

        let mut field = VoxelField::new(dims[0], dims[1], dims[2]);
        let mut skipped = 0usize;
        for cell in &cells {
            let block = cell.block(blocks);
            let Some(info) = self.catalog.lookup(&block.block) else {
                continue;
            };
            if (self.exclude_4m_beams && info.length == 4) || self.exclude_colors.contains(&block.color) {
                skipped += 1;
                continue;
            }
            let value = MaterialKey {
                family_rank: info.family_rank,
                color: block.color,
            }
            .encode()?;
            let c = Coord::new(
                (cell.pos[0] - min[0]) as usize,
                (cell.pos[1] - min[1]) as usize,
                (cell.pos[2] - min[2]) as usize,
            );
            field.set(c, value);
        }
        log::debug!(
            "built {}x{}x{} field: {} armor cells, {} excluded",
            dims[0],
            dims[1],
            dims[2],
            field.occupied_count(),
            skipped
        );

        Ok(BuiltField {
            field,
            origin: min,
            family_count,
        })
    }
}
