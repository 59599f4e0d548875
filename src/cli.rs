use std::path::PathBuf;

use beamify_cover::{Bias, Grain};
use beamify_runtime::BeamifyConfig;
use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "beamify")]
#[command(about = "Merge armor blocks into the fewest, longest beams", long_about = None)]
pub struct Cli {
    /// Input cell list (TOML with [[cells]] entries)
    #[arg(long, short = 'i', value_name = "PATH")]
    pub input: PathBuf,

    /// Armor family catalog
    #[arg(long, value_name = "PATH", default_value = "assets/armor_families.toml")]
    pub catalog: PathBuf,

    /// Run settings file; flags below override its values
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Where to write the [[beams]] report (stdout when omitted)
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Axis priority, least preferred first (e.g. zxy)
    #[arg(long)]
    pub grain: Option<Grain>,

    /// Tie-break policy: random, sided or alternate
    #[arg(long)]
    pub bias: Option<Bias>,

    /// Leave blocks that already are 4m beams untouched
    #[arg(long)]
    pub exclude_4m_beams: bool,

    /// Colors to leave untouched, comma separated
    #[arg(long, value_delimiter = ',', value_name = "COLORS")]
    pub exclude_colors: Vec<u32>,

    /// Largest blob solved in one piece on the first pass
    #[arg(long, value_name = "CELLS")]
    pub threshold: Option<usize>,

    /// Solver budget per blob in milliseconds
    #[arg(long, value_name = "MS")]
    pub time_budget_ms: Option<u64>,

    /// Solver threads (0 = one per core)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Split every armor block into 1m pieces instead
    #[arg(long)]
    pub debeamify: bool,

    /// Also write the log to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Log per-blob detail
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

impl Cli {
    /// Layers command line overrides onto `cfg`.
    pub fn apply_to(&self, mut cfg: BeamifyConfig) -> BeamifyConfig {
        if let Some(g) = self.grain {
            cfg.grain = g;
        }
        if let Some(b) = self.bias {
            cfg.bias = b;
        }
        if self.threshold.is_some() {
            cfg.initial_threshold = self.threshold;
        }
        if let Some(ms) = self.time_budget_ms {
            cfg.time_budget_ms = ms;
        }
        if let Some(w) = self.workers {
            cfg.workers = w;
        }
        cfg.debeamify |= self.debeamify;
        cfg
    }
}
