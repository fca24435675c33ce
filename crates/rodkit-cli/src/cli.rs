use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tony Kan, Ted Yu",
    version,
    about = "rodkit CLI - Inspect, analyze and resample elastic rod trajectories.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the header summary and channel widths of a rod trajectory.
    Info(InfoArgs),
    /// Compute energies, persistence length and RMSD of a rod trajectory.
    Analyze(AnalyzeArgs),
    /// Run a stretch or bend symmetry test; exits non-zero on failure.
    Symmetry(SymmetryArgs),
    /// Thin, subdivide or decimate a rod trajectory and write the result.
    Resample(ResampleArgs),
}

/// Arguments for the `info` subcommand.
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Path to the rod trajectory file.
    #[arg(required = true, value_name = "PATH")]
    pub input: PathBuf,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendArg {
    Reference,
    Fast,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymmetryKindArg {
    Stretch,
    Bend,
}

/// Arguments for the `analyze` subcommand.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    // --- Core Arguments ---
    /// Path to the rod trajectory file.
    #[arg(required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path to an analysis configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Overrides ---
    /// End force applied in a cantilever test; enables the deflection analysis.
    #[arg(short, long, value_name = "FLOAT", allow_negative_numbers = true)]
    pub force: Option<f64>,

    /// Temperature in kelvin for the thermodynamic predictions.
    #[arg(short, long, value_name = "KELVIN")]
    pub temperature: Option<f64>,

    /// Energy formula implementation, overriding the config file.
    #[arg(short, long, value_enum)]
    pub backend: Option<BackendArg>,

    /// Rigid aligner used before RMSD ('kabsch', 'icp' or 'none').
    #[arg(short, long, value_name = "NAME")]
    pub aligner: Option<String>,

    /// Directory to write the per-frame energy and per-node RMSD tables into.
    #[arg(long, value_name = "DIR")]
    pub csv: Option<PathBuf>,
}

/// Arguments for the `symmetry` subcommand.
#[derive(Args, Debug)]
pub struct SymmetryArgs {
    /// Path to the rod trajectory file.
    #[arg(required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Which symmetry test to run.
    #[arg(short, long, value_enum)]
    pub kind: SymmetryKindArg,

    /// Path to an analysis configuration file providing the tolerances.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Arguments for the `resample` subcommand.
#[derive(Args, Debug)]
pub struct ResampleArgs {
    /// Path to the rod trajectory file.
    #[arg(required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the resampled trajectory file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    #[command(flatten)]
    pub operation: ResampleOperation,

    /// Allowed relative deviation from the decimation target.
    #[arg(long, value_name = "FLOAT", default_value_t = 0.5)]
    pub margin: f64,

    /// Rigidly align every frame onto the equilibrium before writing ('kabsch' or 'icp').
    #[arg(long, value_name = "NAME")]
    pub align: Option<String>,
}

/// Exactly one resampling operation.
#[derive(Args, Debug, Clone, Copy)]
#[group(required = true, multiple = false)]
pub struct ResampleOperation {
    /// Keep an even stride of frames, approximately this many.
    #[arg(long, value_name = "FRAMES")]
    pub thin: Option<usize>,

    /// Double the node count this many times (single-frame rods only).
    #[arg(long, value_name = "ITERATIONS")]
    pub subdivide: Option<usize>,

    /// Reduce the node count to approximately this many.
    #[arg(long, value_name = "NODES")]
    pub decimate: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn analyze_parses_overrides() {
        let cli = Cli::try_parse_from([
            "rodkit", "analyze", "run.rodtraj", "--force", "-0.5", "-t", "300", "-b", "fast",
        ])
        .unwrap();
        match cli.command {
            Commands::Analyze(args) => {
                assert_eq!(args.force, Some(-0.5));
                assert_eq!(args.temperature, Some(300.0));
                assert_eq!(args.backend, Some(BackendArg::Fast));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn resample_requires_exactly_one_operation() {
        assert!(Cli::try_parse_from(["rodkit", "resample", "a", "-o", "b"]).is_err());
        assert!(
            Cli::try_parse_from(["rodkit", "resample", "a", "-o", "b", "--thin", "2", "--subdivide", "1"])
                .is_err()
        );
        assert!(Cli::try_parse_from(["rodkit", "resample", "a", "-o", "b", "--thin", "2"]).is_ok());
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["rodkit", "-q", "-v", "info", "a"]).is_err());
    }
}
