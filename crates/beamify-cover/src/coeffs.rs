use std::fmt;
use std::str::FromStr;

use beamify_field::Axis;
use serde::{Deserialize, Serialize};

use crate::configuration::{CONFIGURATIONS, Configuration};

/// Axis ordering from least to most prioritized, e.g. `zxy`.
///
/// An axis at position `p` divides its run rewards by `2^p`, so beams favour the axes listed
/// first.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Grain([Axis; 3]);

impl Grain {
    pub fn new(order: [Axis; 3]) -> Result<Grain, String> {
        let mut seen = [false; 3];
        for a in order {
            if std::mem::replace(&mut seen[a.index()], true) {
                return Err(format!("grain repeats axis '{a}'"));
            }
        }
        Ok(Grain(order))
    }

    #[inline]
    pub fn order(&self) -> [Axis; 3] {
        self.0
    }

    /// Position of `axis` in the ordering (0 = least prioritized).
    #[inline]
    pub fn rank(&self, axis: Axis) -> usize {
        self.0.iter().position(|a| *a == axis).unwrap_or(0)
    }

    #[inline]
    pub fn divisor(&self, axis: Axis) -> f64 {
        (1u32 << self.rank(axis)) as f64
    }
}

impl Default for Grain {
    fn default() -> Self {
        Grain([Axis::Z, Axis::X, Axis::Y])
    }
}

impl FromStr for Grain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let axes: Vec<Axis> = s
            .trim()
            .chars()
            .map(|c| Axis::from_char(c).ok_or_else(|| format!("invalid grain '{s}'")))
            .collect::<Result<_, _>>()?;
        let order: [Axis; 3] = axes
            .try_into()
            .map_err(|_| format!("grain '{s}' must name each of x, y, z once"))?;
        Grain::new(order)
    }
}

impl TryFrom<String> for Grain {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Grain> for String {
    fn from(g: Grain) -> String {
        g.to_string()
    }
}

impl fmt::Display for Grain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for a in self.0 {
            write!(f, "{a}")?;
        }
        Ok(())
    }
}

/// Tie-break policy deciding where shorter beams end up.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bias {
    /// No positional preference.
    #[default]
    Random,
    /// Prefer placements on the low side of every axis.
    Sided,
    /// Like `Sided`, flipped on a checkerboard so neither side is weaker.
    Alternate,
}

impl Bias {
    /// Per-axis positional correction in `[0, 1]` for the cell at `pos` in a field of `extents`.
    pub fn correction(self, pos: [usize; 3], extents: [usize; 3]) -> [f64; 3] {
        if self == Bias::Random {
            return [0.0; 3];
        }
        let mut c = [0.0; 3];
        for a in 0..3 {
            c[a] = pos[a] as f64 / extents[a].max(1) as f64;
        }
        if self == Bias::Alternate {
            // Each axis flips where the other two indices sum to an odd number.
            for a in 0..3 {
                let [u, v] = Axis::ALL[a].others();
                if (pos[u.index()] + pos[v.index()]) % 2 == 1 {
                    c[a] = 1.0 - c[a];
                }
            }
        }
        c
    }
}

impl FromStr for Bias {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(Bias::Random),
            "sided" => Ok(Bias::Sided),
            "alternate" => Ok(Bias::Alternate),
            other => Err(format!("unknown bias '{other}' (random|sided|alternate)")),
        }
    }
}

impl fmt::Display for Bias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Bias::Random => "random",
            Bias::Sided => "sided",
            Bias::Alternate => "alternate",
        };
        f.write_str(s)
    }
}

const SINGLE_COST: f64 = 4.0;
const RUN_COST: [f64; 3] = [-2.0 * 1.1, -3.0 * 1.15, -4.0 * 1.2];

/// Unbiased cost per configuration index.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BaseCoefficients(pub [f64; CONFIGURATIONS]);

impl BaseCoefficients {
    /// Single blocks are penalised, runs rewarded by length, each axis group scaled by the grain.
    pub fn for_grain(grain: Grain) -> Self {
        let mut c = [0.0; CONFIGURATIONS];
        c[0] = SINGLE_COST;
        for axis in Axis::ALL {
            let div = grain.divisor(axis);
            for (k, base) in RUN_COST.iter().enumerate() {
                if let Some(cfg) = Configuration::run(axis, k + 2) {
                    c[cfg.index()] = base / div;
                }
            }
        }
        BaseCoefficients(c)
    }

    #[inline]
    pub fn get(&self, cfg: Configuration) -> f64 {
        self.0[cfg.index()]
    }
}

impl Default for BaseCoefficients {
    fn default() -> Self {
        Self::for_grain(Grain::default())
    }
}
