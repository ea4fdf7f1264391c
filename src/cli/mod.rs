//! Command-line parsing for the growth phenotype scorer.
//!
//! Argument parsing and command dispatch stay separate from the fitting and
//! statistics code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::GrowthModel;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "growthcall", version, about = "Growth phenotype scoring for plate OD time series")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Score a long-format plate CSV (strain, plate, replicate, well, time, od[, metabolite]).
    Run(RunArgs),
    /// Score a synthetic plate generated from the growth models.
    Demo(DemoArgs),
}

/// Scoring options shared by every subcommand.
#[derive(Debug, Args, Clone)]
pub struct ScoreArgs {
    /// Growth model fitted to each replicate series.
    #[arg(long, value_enum, default_value_t = GrowthModel::Logistic)]
    pub growth_model: GrowthModel,

    /// Minimum R² for accepting a fit (SGR is undefined below it).
    #[arg(long, default_value_t = 0.90)]
    pub min_r2: f64,

    /// Randomized initial guesses per series.
    #[arg(long, default_value_t = 50)]
    pub max_trials: usize,

    /// Levenberg–Marquardt iteration cap per trial.
    #[arg(long, default_value_t = 200)]
    pub max_iterations: usize,

    /// Minimum mean fold change vs the control for a `+` call.
    #[arg(long, default_value_t = 1.2)]
    pub fc_cutoff: f64,

    /// A `+` call requires p below this.
    #[arg(long, default_value_t = 0.05)]
    pub pvalue_cutoff: f64,

    /// Seed for initial-guess sampling.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Negative-control well of every plate/strain group.
    #[arg(long, default_value = "A1")]
    pub control_well: String,
}

/// Where and how to write results.
#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    /// Write `<stem>_all.csv`, `<stem>_summary.csv` and `<stem>.json` here.
    #[arg(long, value_name = "DIR")]
    pub export_dir: Option<PathBuf>,

    /// File stem for exports (default: output_<YYYYmmdd_HHMMSS>).
    #[arg(long)]
    pub stem: Option<String>,

    /// Also write the full report as JSON to this path.
    #[arg(long, value_name = "PATH")]
    pub json: Option<PathBuf>,

    /// Print every well's means, fold changes and p-values.
    #[arg(long)]
    pub all_wells: bool,
}

/// Options for `growthcall run`.
#[derive(Debug, Parser, Clone)]
pub struct RunArgs {
    /// Long-format plate CSV.
    #[arg(short, long, value_name = "CSV")]
    pub input: PathBuf,

    #[command(flatten)]
    pub score: ScoreArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Options for `growthcall demo`.
#[derive(Debug, Parser, Clone)]
pub struct DemoArgs {
    /// Wells per plate, filled row-major from A1.
    #[arg(long, default_value_t = 24)]
    pub wells: usize,

    /// Replicates per well.
    #[arg(long, default_value_t = 3)]
    pub replicates: u32,

    /// Standard deviation of the additive OD noise.
    #[arg(long, default_value_t = 0.01)]
    pub noise: f64,

    /// Strain names (comma-separated).
    #[arg(long, value_delimiter = ',', default_value = "WT,mutant")]
    pub strains: Vec<String>,

    /// Seed for the synthetic plate.
    #[arg(long, default_value_t = 7)]
    pub data_seed: u64,

    #[command(flatten)]
    pub score: ScoreArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_defaults_match_score_config() {
        let cli = Cli::parse_from(["growthcall", "run", "--input", "plate.csv"]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.input, PathBuf::from("plate.csv"));
        assert_eq!(args.score.growth_model, GrowthModel::Logistic);
        assert_eq!(args.score.min_r2, 0.90);
        assert_eq!(args.score.max_trials, 50);
        assert_eq!(args.score.fc_cutoff, 1.2);
        assert_eq!(args.score.pvalue_cutoff, 0.05);
        assert_eq!(args.score.control_well, "A1");
        assert!(args.output.export_dir.is_none());
    }

    #[test]
    fn demo_accepts_scoring_flags() {
        let cli = Cli::parse_from([
            "growthcall",
            "demo",
            "--growth-model",
            "gompertz",
            "--strains",
            "WT,dA,dB",
            "--max-trials",
            "10",
        ]);
        let Command::Demo(args) = cli.command else {
            panic!("expected demo");
        };
        assert_eq!(args.score.growth_model, GrowthModel::Gompertz);
        assert_eq!(args.strains, vec!["WT", "dA", "dB"]);
        assert_eq!(args.score.max_trials, 10);
    }
}
