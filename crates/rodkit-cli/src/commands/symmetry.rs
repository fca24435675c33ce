use super::load_trajectory;
use crate::cli::{SymmetryArgs, SymmetryKindArg};
use crate::config::PartialAnalysisConfig;
use crate::error::{CliError, Result};
use rodkit::engine::analysis::RodAnalysis;
use rodkit::engine::tasks::symmetry::SymmetryKind;
use tracing::info;

pub fn run(args: SymmetryArgs) -> Result<()> {
    let app_config = PartialAnalysisConfig::from_optional_file(args.config.as_deref())?.build()?;
    let (rod, _) = load_trajectory(&args.input)?;

    let kind = match args.kind {
        SymmetryKindArg::Stretch => SymmetryKind::Stretch,
        SymmetryKindArg::Bend => SymmetryKind::Bend,
    };
    info!("Running {} symmetry test.", kind);
    let analysis = RodAnalysis::new(&rod, app_config.core_config);
    let report = analysis.symmetry_test(kind)?;

    if report.passed {
        println!("✓ {} symmetry test passed.", kind);
        return Ok(());
    }
    for failure in &report.failures {
        println!("  ✗ {}", failure);
    }
    Err(CliError::SymmetryFailed {
        kind: kind.to_string(),
        count: report.failures.len(),
    })
}
