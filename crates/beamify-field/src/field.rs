use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::coord::Coord;

/// Colors available per armor family; material values are `32 * rank + color + 1`.
pub const COLORS_PER_FAMILY: u32 = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("field dimensions {sx}x{sy}x{sz} need {expected} values, got {actual}")]
    DimensionMismatch {
        sx: usize,
        sy: usize,
        sz: usize,
        expected: usize,
        actual: usize,
    },
    #[error("value {value} at {at} is outside the material range 0..={max}")]
    ValueOutOfRange { value: u32, at: Coord, max: u32 },
    #[error("color {color} is outside 0..32")]
    ColorOutOfRange { color: u32 },
    #[error("family rank {rank} does not fit a material value")]
    FamilyOutOfRange { rank: u32 },
    #[error("field span {span} along {axis} exceeds the limit of {limit}")]
    SpanTooLarge { axis: char, span: i64, limit: i64 },
    #[error("block '{block}' at {pos:?} runs past the coordinate range")]
    PositionOverflow { block: String, pos: [i32; 3] },
}

/// Family rank and color packed into a material value.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialKey {
    pub family_rank: u32,
    pub color: u32,
}

impl MaterialKey {
    pub fn encode(self) -> Result<u32, FieldError> {
        if self.color >= COLORS_PER_FAMILY {
            return Err(FieldError::ColorOutOfRange { color: self.color });
        }
        self.family_rank
            .checked_mul(COLORS_PER_FAMILY)
            .and_then(|v| v.checked_add(self.color + 1))
            .ok_or(FieldError::FamilyOutOfRange {
                rank: self.family_rank,
            })
    }

    /// Inverse of [`MaterialKey::encode`]; `None` for empty cells.
    #[inline]
    pub fn decode(value: u32) -> Option<MaterialKey> {
        let v = value.checked_sub(1)?;
        Some(MaterialKey {
            family_rank: v / COLORS_PER_FAMILY,
            color: v % COLORS_PER_FAMILY,
        })
    }
}

/// Dense 3D grid of non-negative ids, 0 = empty.
///
/// Holds material values before a pass and per-pass beam-group ids after one; both use the
/// same layout so the orchestrator can hand either to the same helpers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoxelField {
    pub sx: usize,
    pub sy: usize,
    pub sz: usize,
    values: Vec<u32>,
}

impl VoxelField {
    pub fn new(sx: usize, sy: usize, sz: usize) -> Self {
        Self {
            sx,
            sy,
            sz,
            values: vec![0; sx * sy * sz],
        }
    }

    /// Same extents as `self`, every cell empty.
    pub fn empty_like(&self) -> Self {
        Self::new(self.sx, self.sy, self.sz)
    }

    /// Validated construction from a dense array laid out as [`VoxelField::idx`] expects.
    ///
    /// Every non-zero value must decode to a family rank below `family_count`.
    pub fn from_values(
        sx: usize,
        sy: usize,
        sz: usize,
        values: Vec<u32>,
        family_count: u32,
    ) -> Result<Self, FieldError> {
        let expected = sx * sy * sz;
        if values.len() != expected {
            return Err(FieldError::DimensionMismatch {
                sx,
                sy,
                sz,
                expected,
                actual: values.len(),
            });
        }
        let max = family_count.saturating_mul(COLORS_PER_FAMILY);
        let field = Self {
            sx,
            sy,
            sz,
            values,
        };
        for (c, v) in field.iter_occupied() {
            if v > max {
                return Err(FieldError::ValueOutOfRange { value: v, at: c, max });
            }
        }
        Ok(field)
    }

    #[inline]
    pub fn dims(&self) -> (usize, usize, usize) {
        (self.sx, self.sy, self.sz)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize, z: usize) -> usize {
        (y * self.sz + z) * self.sx + x
    }

    #[inline]
    pub fn contains(&self, c: Coord) -> bool {
        c.x < self.sx && c.y < self.sy && c.z < self.sz
    }

    /// Value at `c`; out-of-bounds reads as empty.
    #[inline]
    pub fn get(&self, c: Coord) -> u32 {
        if self.contains(c) {
            self.values[self.idx(c.x, c.y, c.z)]
        } else {
            0
        }
    }

    /// Writes `v` at `c`. Returns false (and writes nothing) when `c` is out of bounds.
    #[inline]
    pub fn set(&mut self, c: Coord, v: u32) -> bool {
        if !self.contains(c) {
            return false;
        }
        let i = self.idx(c.x, c.y, c.z);
        self.values[i] = v;
        true
    }

    pub fn clear_cells<'a>(&mut self, cells: impl IntoIterator<Item = &'a Coord>) {
        for c in cells {
            self.set(*c, 0);
        }
    }

    pub fn occupied_count(&self) -> usize {
        self.values.iter().filter(|v| **v != 0).count()
    }

    /// Occupied cells in lexicographic (x, y, z) order.
    pub fn iter_occupied(&self) -> impl Iterator<Item = (Coord, u32)> + '_ {
        (0..self.sx).flat_map(move |x| {
            (0..self.sy).flat_map(move |y| {
                (0..self.sz).filter_map(move |z| {
                    let v = self.values[self.idx(x, y, z)];
                    (v != 0).then_some((Coord::new(x, y, z), v))
                })
            })
        })
    }

    /// Distinct non-zero values present in the field.
    pub fn materials(&self) -> BTreeSet<u32> {
        self.values.iter().copied().filter(|v| *v != 0).collect()
    }

    /// Cells holding `value`, in lexicographic order.
    pub fn cells_with(&self, value: u32) -> Vec<Coord> {
        self.iter_occupied()
            .filter(|(_, v)| *v == value)
            .map(|(c, _)| c)
            .collect()
    }

    /// All cells grouped by value, each group in lexicographic order.
    pub fn groups(&self) -> BTreeMap<u32, Vec<Coord>> {
        let mut out: BTreeMap<u32, Vec<Coord>> = BTreeMap::new();
        for (c, v) in self.iter_occupied() {
            out.entry(v).or_default().push(c);
        }
        out
    }
}
