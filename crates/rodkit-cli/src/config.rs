use crate::cli::{AnalyzeArgs, BackendArg};
use crate::error::{CliError, Result};
use rodkit::engine::config as core_config;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialAnalysisSection {
    backend: Option<core_config::MathBackend>,
    temperature: Option<f64>,
    aligner: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialAlignmentSection {
    max_iterations: Option<usize>,
    tolerance: Option<f64>,
    reanchor_interval: Option<usize>,
    progress_interval: Option<usize>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialSymmetrySection {
    stretch_energy: Option<f64>,
    bend_energy: Option<f64>,
    central_node: Option<f64>,
    side_dynamics: Option<f64>,
    straightness: Option<f64>,
    opposite_motion: Option<f64>,
}

/// Analysis settings as read from a TOML file; every key is optional.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialAnalysisConfig {
    analysis: Option<PartialAnalysisSection>,
    alignment: Option<PartialAlignmentSection>,
    symmetry: Option<PartialSymmetrySection>,
}

/// A fully merged configuration plus the collaborator choice it names.
#[derive(Debug)]
pub struct AppConfig {
    pub core_config: core_config::AnalysisConfig,
    pub aligner: Option<String>,
}

impl PartialAnalysisConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Loads `path` if given, otherwise starts from an empty configuration.
    pub fn from_optional_file(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Applies the `analyze` command-line overrides on top of the file.
    pub fn merge_with_cli(mut self, args: &AnalyzeArgs) -> Result<AppConfig> {
        let section = self.analysis.get_or_insert_with(Default::default);
        if let Some(backend) = args.backend {
            section.backend = Some(match backend {
                BackendArg::Reference => core_config::MathBackend::Reference,
                BackendArg::Fast => core_config::MathBackend::Fast,
            });
        }
        if let Some(temperature) = args.temperature {
            section.temperature = Some(temperature);
        }
        if let Some(aligner) = &args.aligner {
            section.aligner = Some(aligner.clone());
        }
        self.build()
    }

    /// Builds the configuration from the file values and defaults alone.
    pub fn build(self) -> Result<AppConfig> {
        let analysis = self.analysis.unwrap_or_default();
        let alignment = Self::merge_alignment(self.alignment);
        let symmetry = Self::merge_symmetry(self.symmetry);

        let mut builder = core_config::AnalysisConfig::builder()
            .backend(analysis.backend.unwrap_or_default())
            .alignment(alignment)
            .symmetry(symmetry);
        if let Some(temperature) = analysis.temperature {
            builder = builder.temperature(temperature);
        }

        Ok(AppConfig {
            core_config: builder.build()?,
            aligner: analysis.aligner,
        })
    }

    fn merge_alignment(partial: Option<PartialAlignmentSection>) -> core_config::AlignmentConfig {
        let partial = partial.unwrap_or_default();
        let defaults = core_config::AlignmentConfig::default();
        core_config::AlignmentConfig {
            max_iterations: partial.max_iterations.unwrap_or(defaults.max_iterations),
            tolerance: partial.tolerance.unwrap_or(defaults.tolerance),
            reanchor_interval: partial.reanchor_interval.unwrap_or(defaults.reanchor_interval),
            progress_interval: partial.progress_interval.unwrap_or(defaults.progress_interval),
        }
    }

    fn merge_symmetry(partial: Option<PartialSymmetrySection>) -> core_config::SymmetryTolerances {
        let partial = partial.unwrap_or_default();
        let defaults = core_config::SymmetryTolerances::default();
        core_config::SymmetryTolerances {
            stretch_energy: partial.stretch_energy.unwrap_or(defaults.stretch_energy),
            bend_energy: partial.bend_energy.unwrap_or(defaults.bend_energy),
            central_node: partial.central_node.unwrap_or(defaults.central_node),
            side_dynamics: partial.side_dynamics.unwrap_or(defaults.side_dynamics),
            straightness: partial.straightness.unwrap_or(defaults.straightness),
            opposite_motion: partial.opposite_motion.unwrap_or(defaults.opposite_motion),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use std::fs;
    use tempfile::tempdir;

    fn analyze_args(extra: &[&str]) -> AnalyzeArgs {
        let mut argv = vec!["rodkit", "analyze", "run.rodtraj"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Analyze(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn empty_config_uses_core_defaults() {
        let app = PartialAnalysisConfig::default().build().unwrap();
        assert_eq!(app.core_config.backend, core_config::MathBackend::Reference);
        assert_eq!(app.core_config.alignment, core_config::AlignmentConfig::default());
        assert_eq!(app.core_config.temperature, None);
        assert!(app.aligner.is_none());
    }

    #[test]
    fn file_values_are_loaded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rodkit.toml");
        fs::write(
            &path,
            r#"
            [analysis]
            backend = "fast"
            temperature = 298.0
            aligner = "icp"

            [alignment]
            max-iterations = 50
            reanchor-interval = 100

            [symmetry]
            bend-energy = 0.05
            "#,
        )
        .unwrap();
        let app = PartialAnalysisConfig::from_file(&path).unwrap().build().unwrap();
        assert_eq!(app.core_config.backend, core_config::MathBackend::Fast);
        assert_eq!(app.core_config.temperature, Some(298.0));
        assert_eq!(app.core_config.alignment.max_iterations, 50);
        assert_eq!(app.core_config.alignment.reanchor_interval, 100);
        assert_eq!(app.core_config.alignment.tolerance, 1e-9);
        assert_eq!(app.core_config.symmetry.bend_energy, 0.05);
        assert_eq!(app.core_config.symmetry.stretch_energy, 0.001);
        assert_eq!(app.aligner.as_deref(), Some("icp"));
    }

    #[test]
    fn cli_overrides_win_over_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rodkit.toml");
        fs::write(&path, "[analysis]\nbackend = \"fast\"\ntemperature = 200.0\n").unwrap();
        let partial = PartialAnalysisConfig::from_file(&path).unwrap();
        let app = partial
            .merge_with_cli(&analyze_args(&["-b", "reference", "-t", "310", "-a", "kabsch"]))
            .unwrap();
        assert_eq!(app.core_config.backend, core_config::MathBackend::Reference);
        assert_eq!(app.core_config.temperature, Some(310.0));
        assert_eq!(app.aligner.as_deref(), Some("kabsch"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rodkit.toml");
        fs::write(&path, "[analysis]\nbackedn = \"fast\"\n").unwrap();
        assert!(matches!(
            PartialAnalysisConfig::from_file(&path),
            Err(CliError::FileParsing { .. })
        ));
    }

    #[test]
    fn invalid_values_surface_as_config_errors() {
        let partial: PartialAnalysisConfig = toml::from_str("[analysis]\ntemperature = -4.0\n").unwrap();
        assert!(matches!(partial.build(), Err(CliError::Config(_))));
    }
}
