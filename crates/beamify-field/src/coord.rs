use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Grid axis. Beams only ever extend towards the positive end of one of these.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn as_char(self) -> char {
        match self {
            Axis::X => 'x',
            Axis::Y => 'y',
            Axis::Z => 'z',
        }
    }

    pub fn from_char(c: char) -> Option<Axis> {
        match c.to_ascii_lowercase() {
            'x' => Some(Axis::X),
            'y' => Some(Axis::Y),
            'z' => Some(Axis::Z),
            _ => None,
        }
    }

    /// The two axes orthogonal to this one, in x/y/z order.
    #[inline]
    pub fn others(self) -> [Axis; 2] {
        match self {
            Axis::X => [Axis::Y, Axis::Z],
            Axis::Y => [Axis::X, Axis::Z],
            Axis::Z => [Axis::X, Axis::Y],
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl FromStr for Axis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Axis::from_char(c).ok_or_else(|| format!("unknown axis '{s}'")),
            _ => Err(format!("unknown axis '{s}'")),
        }
    }
}

/// Index triple into a dense field. Ordering is lexicographic on (x, y, z).
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Coord {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl Coord {
    #[inline]
    pub const fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn get(self, axis: Axis) -> usize {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// Step `k` cells towards +axis.
    #[inline]
    pub fn forward(self, axis: Axis, k: usize) -> Coord {
        match axis {
            Axis::X => Coord::new(self.x + k, self.y, self.z),
            Axis::Y => Coord::new(self.x, self.y + k, self.z),
            Axis::Z => Coord::new(self.x, self.y, self.z + k),
        }
    }

    /// Step `k` cells towards -axis, or `None` when that leaves the grid.
    #[inline]
    pub fn back(self, axis: Axis, k: usize) -> Option<Coord> {
        Some(match axis {
            Axis::X => Coord::new(self.x.checked_sub(k)?, self.y, self.z),
            Axis::Y => Coord::new(self.x, self.y.checked_sub(k)?, self.z),
            Axis::Z => Coord::new(self.x, self.y, self.z.checked_sub(k)?),
        })
    }
}

impl From<(usize, usize, usize)> for Coord {
    #[inline]
    fn from((x, y, z): (usize, usize, usize)) -> Self {
        Coord::new(x, y, z)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.x, self.y, self.z)
    }
}
