use beamify_field::{Axis, Coord};

/// Choices per anchor cell: one unit block plus lengths 2..=4 along each axis.
pub const CONFIGURATIONS: usize = 10;

/// One of the ten placements anchored at a cell.
///
/// Index 0 is the unit block; 1..=3 run along +x with lengths 2..=4, 4..=6 along +y and
/// 7..=9 along +z.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Configuration(u8);

impl Configuration {
    pub const SINGLE: Configuration = Configuration(0);

    #[inline]
    pub fn from_index(i: usize) -> Option<Configuration> {
        (i < CONFIGURATIONS).then_some(Configuration(i as u8))
    }

    /// Run of `length` (2..=4) cells along `axis`.
    #[inline]
    pub fn run(axis: Axis, length: usize) -> Option<Configuration> {
        if !(2..=4).contains(&length) {
            return None;
        }
        Some(Configuration((1 + axis.index() * 3 + (length - 2)) as u8))
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn axis(self) -> Option<Axis> {
        match self.0 {
            0 => None,
            i => Some(Axis::ALL[(i as usize - 1) / 3]),
        }
    }

    /// Cells covered: 1 for the unit block, else the run length.
    #[inline]
    pub fn length(self) -> usize {
        match self.0 {
            0 => 1,
            i => (i as usize - 1) % 3 + 2,
        }
    }

    /// Cells covered when anchored at `anchor`, anchor first.
    pub fn cells(self, anchor: Coord) -> impl Iterator<Item = Coord> {
        let axis = self.axis().unwrap_or(Axis::X);
        (0..self.length()).map(move |k| anchor.forward(axis, k))
    }

    pub fn all() -> impl Iterator<Item = Configuration> {
        (0..CONFIGURATIONS as u8).map(Configuration)
    }
}

/// Column of the decision variable for (`cell`, `cfg`).
#[inline]
pub fn variable_index(cell: usize, cfg: Configuration) -> usize {
    CONFIGURATIONS * cell + cfg.index()
}

/// Inverse of [`variable_index`].
#[inline]
pub fn split_variable(var: usize) -> (usize, Configuration) {
    (var / CONFIGURATIONS, Configuration((var % CONFIGURATIONS) as u8))
}
