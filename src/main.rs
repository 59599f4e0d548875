mod cli;
mod io;
mod logging;

use std::error::Error;
use std::process::ExitCode;

use beamify_field::{ArmorCatalog, FieldBuilder};
use beamify_runtime::{BeamifyConfig, Beamifier};
use clap::Parser;

use crate::cli::Cli;

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let config = match &cli.config {
        Some(path) => BeamifyConfig::from_path(path)?,
        None => BeamifyConfig::default(),
    };
    let config = cli.apply_to(config);
    config.validate()?;

    let catalog = ArmorCatalog::from_path(&cli.catalog)?;
    let blocks = io::read_input(&cli.input)?;
    let built = FieldBuilder::new(&catalog)
        .exclude_4m_beams(cli.exclude_4m_beams)
        .exclude_colors(cli.exclude_colors.iter().copied())
        .build(&blocks)?;
    log::info!(
        "loaded {} blocks; field {:?} at origin {:?} with {} armor cells",
        blocks.len(),
        built.field.dims(),
        built.origin,
        built.field.occupied_count()
    );

    let report = Beamifier::new(config)?.run(&built.field)?;
    let beams = report.labeled.beams();
    let records = io::beam_records(&built, &catalog, &beams)?;
    log::info!(
        "{} armor cells -> {} beams over {} passes",
        built.field.occupied_count(),
        records.len(),
        report.passes.len()
    );
    io::write_output(
        cli.output.as_deref(),
        &io::OutputFile {
            passes: report.passes.len(),
            beams: records,
        },
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = logging::init(cli.verbose, cli.log_file.as_deref()) {
        eprintln!("failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
