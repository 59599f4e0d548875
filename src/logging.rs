use std::error::Error;
use std::fs::File;
use std::path::Path;

use log::LevelFilter;
use simplelog::{ColorChoice, CombinedLogger, ConfigBuilder, TermLogger, TerminalMode, WriteLogger};

/// Installs the process logger.
///
/// Without a log file this is `env_logger`, so `RUST_LOG` still applies. With one, terminal and
/// file output are combined through `simplelog`.
pub fn init(verbose: bool, log_file: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    match log_file {
        None => {
            env_logger::Builder::new()
                .filter_level(level)
                .parse_default_env()
                .try_init()?;
        }
        Some(path) => {
            let config = ConfigBuilder::new()
                .set_thread_level(LevelFilter::Debug)
                .build();
            CombinedLogger::init(vec![
                TermLogger::new(level, config.clone(), TerminalMode::Stderr, ColorChoice::Auto),
                WriteLogger::new(level, config, File::create(path)?),
            ])?;
        }
    }
    Ok(())
}
