use std::error::Error;
use std::path::Path;
use std::time::Duration;

use beamify_cover::{BaseCoefficients, Bias, Grain};
use serde::{Deserialize, Serialize};

/// Run settings, loadable from TOML. Every field has a default so partial files are fine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BeamifyConfig {
    #[serde(default)]
    pub grain: Grain,
    #[serde(default)]
    pub bias: Bias,
    /// Largest blob handed to the solver in the first pass. Defaults to the field's cell count.
    #[serde(default)]
    pub initial_threshold: Option<usize>,
    #[serde(default = "default_time_budget_ms")]
    pub time_budget_ms: u64,
    #[serde(default = "default_max_passes")]
    pub max_passes: usize,
    #[serde(default = "default_max_stalled_passes")]
    pub max_stalled_passes: usize,
    /// Solver threads; 0 lets rayon pick.
    #[serde(default)]
    pub workers: usize,
    /// Split every cell into unit blocks instead of merging.
    #[serde(default)]
    pub debeamify: bool,
    /// Replaces the grain-derived base costs when set.
    #[serde(default)]
    pub coefficients: Option<BaseCoefficients>,
}

fn default_time_budget_ms() -> u64 {
    15_000
}
fn default_max_passes() -> usize {
    4096
}
fn default_max_stalled_passes() -> usize {
    64
}

impl Default for BeamifyConfig {
    fn default() -> Self {
        Self {
            grain: Grain::default(),
            bias: Bias::default(),
            initial_threshold: None,
            time_budget_ms: default_time_budget_ms(),
            max_passes: default_max_passes(),
            max_stalled_passes: default_max_stalled_passes(),
            workers: 0,
            debeamify: false,
            coefficients: None,
        }
    }
}

impl BeamifyConfig {
    pub fn from_toml_str(toml_str: &str) -> Result<Self, Box<dyn Error>> {
        let cfg: BeamifyConfig = toml::from_str(toml_str)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let s = std::fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }

    pub fn validate(&self) -> Result<(), Box<dyn Error>> {
        if self.initial_threshold == Some(0) {
            return Err("initial_threshold must be at least 1".into());
        }
        if self.max_passes == 0 {
            return Err("max_passes must be at least 1".into());
        }
        if let Some(c) = &self.coefficients {
            if c.0.iter().any(|v| !v.is_finite()) {
                return Err("coefficients must be finite".into());
            }
        }
        Ok(())
    }

    /// Base costs in effect: the explicit override, else the grain-derived vector.
    pub fn coefficients(&self) -> BaseCoefficients {
        self.coefficients
            .unwrap_or_else(|| BaseCoefficients::for_grain(self.grain))
    }

    #[inline]
    pub fn time_budget(&self) -> Duration {
        Duration::from_millis(self.time_budget_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = BeamifyConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, BeamifyConfig::default());
        assert_eq!(cfg.grain.to_string(), "zxy");
        assert_eq!(cfg.time_budget(), Duration::from_secs(15));
    }

    #[test]
    fn parses_every_field() {
        let cfg = BeamifyConfig::from_toml_str(
            r#"
            grain = "xyz"
            bias = "alternate"
            initial_threshold = 64
            time_budget_ms = 500
            max_passes = 10
            max_stalled_passes = 2
            workers = 3
            debeamify = true
            coefficients = [4.0, -1.0, -2.0, -3.0, -1.0, -2.0, -3.0, -1.0, -2.0, -3.0]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.grain, "xyz".parse().unwrap());
        assert_eq!(cfg.bias, Bias::Alternate);
        assert_eq!(cfg.initial_threshold, Some(64));
        assert_eq!(cfg.workers, 3);
        assert!(cfg.debeamify);
        assert_eq!(cfg.coefficients().0[3], -3.0);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(BeamifyConfig::from_toml_str("grain = \"xxy\"").is_err());
        assert!(BeamifyConfig::from_toml_str("bias = \"diagonal\"").is_err());
        assert!(BeamifyConfig::from_toml_str("initial_threshold = 0").is_err());
        assert!(BeamifyConfig::from_toml_str("coefficients = [1.0, 2.0]").is_err());
    }

    #[test]
    fn grain_drives_coefficients_without_override() {
        let cfg = BeamifyConfig {
            grain: "yxz".parse().unwrap(),
            ..Default::default()
        };
        assert_eq!(cfg.coefficients(), BaseCoefficients::for_grain(cfg.grain));
    }
}
