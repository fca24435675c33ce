use super::{load_trajectory, resolve_aligner};
use crate::cli::AnalyzeArgs;
use crate::config::PartialAnalysisConfig;
use crate::error::{CliError, Result};
use crate::utils::progress::FrameProgress;
use rodkit::engine::collaborators::Collaborators;
use rodkit::engine::progress::ProgressReporter;
use rodkit::workflows;
use tracing::info;

pub fn run(args: AnalyzeArgs) -> Result<()> {
    let partial = PartialAnalysisConfig::from_optional_file(args.config.as_deref())?;
    info!("Merging configuration from file and CLI arguments...");
    let app_config = partial.merge_with_cli(&args)?;

    let mut collaborators = Collaborators::new();
    if let Some(name) = &app_config.aligner {
        if let Some(aligner) = resolve_aligner(name)? {
            collaborators = collaborators.with_aligner(aligner);
        }
    }

    let (rod, _) = load_trajectory(&args.input)?;

    let progress = FrameProgress::new();
    let reporter = ProgressReporter::with_callback(progress.callback());

    println!("Analyzing rod trajectory...");
    let report = workflows::analyze::run(
        &rod,
        &app_config.core_config,
        &collaborators,
        args.force,
        &reporter,
    )?;

    let summary = report
        .to_toml_summary()
        .map_err(|e| CliError::Other(e.into()))?;
    println!("{}", summary);

    if let Some(dir) = &args.csv {
        std::fs::create_dir_all(dir)?;
        let stem = args
            .input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "rod".to_string());
        workflows::tables::write_tables(&report, dir, &stem)
            .map_err(|e| CliError::Other(e.into()))?;
        println!("Tables written to: {}", dir.display());
    }
    Ok(())
}
