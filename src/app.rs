//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads a plate CSV or generates a synthetic plate
//! - runs the scoring pipeline
//! - prints reports
//! - writes optional exports

use clap::Parser;
use tracing::{info, warn};

use crate::cli::{Command, DemoArgs, OutputArgs, RunArgs, ScoreArgs};
use crate::data::{SampleSpec, generate_plate};
use crate::domain::{PlateDataset, RunReport, ScoreConfig, WellId};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `growthcall` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Demo(args) => handle_demo(args),
    }
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    let config = score_config_from_args(&args.score);
    config.validate()?;

    let ingested = crate::io::load_plate_csv(&args.input)?;
    info!(
        path = %args.input.display(),
        rows_read = ingested.rows_read,
        rows_used = ingested.rows_used,
        wells = ingested.dataset.wells.len(),
        "plate loaded"
    );
    for e in &ingested.row_errors {
        warn!(line = e.line, "{}", e.message);
    }
    for r in &ingested.rejected {
        warn!(well = %r.key, replicate = r.replicate, "series rejected: {}", r.error);
    }

    score_and_emit(&ingested.dataset, &config, &args.output)
}

fn handle_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = score_config_from_args(&args.score);
    config.validate()?;

    let spec = SampleSpec {
        strains: args.strains.clone(),
        wells: args.wells,
        replicates: args.replicates,
        model: config.growth_model,
        noise_sd: args.noise,
        control_well: config.control_well.clone(),
        seed: args.data_seed,
        ..SampleSpec::default()
    };
    let dataset = generate_plate(&spec)?;
    info!(
        wells = dataset.wells.len(),
        series = dataset.n_series(),
        "synthetic plate generated"
    );

    score_and_emit(&dataset, &config, &args.output)
}

fn score_and_emit(dataset: &PlateDataset, config: &ScoreConfig, output: &OutputArgs) -> Result<(), AppError> {
    let report = pipeline::score_dataset(dataset, config)?;
    print_report(&report, output.all_wells);
    write_exports(&report, output)
}

fn print_report(report: &RunReport, all_wells: bool) {
    println!("{}", crate::report::format_run_summary(report));
    if all_wells {
        println!("{}", crate::report::format_well_table(&report.wells));
    }
    let rows = crate::report::summary_rows(report);
    let strains = crate::report::report_strains(report);
    println!("{}", crate::report::format_summary_table(&rows, &strains));
}

fn write_exports(report: &RunReport, output: &OutputArgs) -> Result<(), AppError> {
    if let Some(dir) = &output.export_dir {
        let stem = output.stem.clone().unwrap_or_else(crate::io::default_stem);
        for path in crate::io::export_all(dir, &stem, report)? {
            info!(path = %path.display(), "export written");
        }
    }
    if let Some(path) = &output.json {
        crate::io::write_report_json(path, report)?;
        info!(path = %path.display(), "report JSON written");
    }
    Ok(())
}

pub fn score_config_from_args(args: &ScoreArgs) -> ScoreConfig {
    ScoreConfig {
        growth_model: args.growth_model,
        min_r2: args.min_r2,
        max_trials: args.max_trials,
        max_iterations: args.max_iterations,
        fc_cutoff: args.fc_cutoff,
        pvalue_cutoff: args.pvalue_cutoff,
        seed: args.seed,
        control_well: WellId::new(&args.control_well),
    }
}
