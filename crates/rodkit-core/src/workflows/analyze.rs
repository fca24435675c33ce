use crate::core::models::trajectory::RodTrajectory;
use crate::engine::analysis::{Equipartition, RodAnalysis};
use crate::engine::collaborators::Collaborators;
use crate::engine::config::AnalysisConfig;
use crate::engine::error::AnalysisError;
use crate::engine::grid::mean;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::tasks::persistence::PersistenceLength;
use serde::Serialize;
use tracing::{info, instrument};

/// Energies of one frame averaged over the rod.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameEnergies {
    pub frame: usize,
    pub stretch: f64,
    pub bend: f64,
    pub twist: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergySummary {
    pub per_frame: Vec<FrameEnergies>,
    pub mean_stretch: f64,
    pub mean_bend: f64,
    pub mean_twist: f64,
    pub ei: f64,
    pub half_kbt: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistenceSummary {
    pub mean_cos: f64,
    pub saturated: bool,
    /// Mean over frames of the tangent-correlation estimate.
    pub mean_length: f64,
    /// Rod-averaged freely-jointed-chain estimate from the frame-averaged cosines.
    pub fjc_mean: f64,
    /// Rod-averaged worm-like-chain estimate from the frame-averaged cosines.
    pub wlc_mean: f64,
    pub analytical: Option<f64>,
    #[serde(skip)]
    pub detail: Option<PersistenceLength>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RmsdSummary {
    pub aligner: Option<&'static str>,
    pub per_node: Vec<f64>,
    pub per_frame: Vec<f64>,
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeflectionSummary {
    pub force: f64,
    pub deflection: Vec<f64>,
    pub ei: Vec<f64>,
    pub analytical_deflection: f64,
}

/// Everything the analyze workflow derives from one trajectory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub nodes: usize,
    pub frames: usize,
    pub backend: &'static str,
    pub energies: EnergySummary,
    pub persistence: PersistenceSummary,
    pub rmsd: RmsdSummary,
    pub deflection: Option<DeflectionSummary>,
}

#[derive(Serialize)]
struct ReportHeadline<'a> {
    nodes: usize,
    frames: usize,
    backend: &'a str,
    mean_stretch_energy: f64,
    mean_bend_energy: f64,
    mean_twist_energy: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    half_kbt: Option<f64>,
    persistence_length: f64,
    persistence_saturated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    analytical_persistence_length: Option<f64>,
    mean_rmsd: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    aligner: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mean_ei_from_deflection: Option<f64>,
}

impl AnalysisReport {
    /// The scalar headline of the report as a TOML document.
    pub fn to_toml_summary(&self) -> Result<String, toml::ser::Error> {
        let headline = ReportHeadline {
            nodes: self.nodes,
            frames: self.frames,
            backend: self.backend,
            mean_stretch_energy: self.energies.mean_stretch,
            mean_bend_energy: self.energies.mean_bend,
            mean_twist_energy: self.energies.mean_twist,
            half_kbt: self.energies.half_kbt,
            persistence_length: self.persistence.mean_length,
            persistence_saturated: self.persistence.saturated,
            analytical_persistence_length: self.persistence.analytical,
            mean_rmsd: self.rmsd.mean,
            aligner: self.rmsd.aligner,
            mean_ei_from_deflection: self.deflection.as_ref().map(|d| mean(&d.ei)),
        };
        toml::to_string(&headline)
    }
}

/// Runs the full analysis over `rod`: equipartition energies, both
/// persistence-length estimators, RMSD against the equilibrium (aligned when
/// an aligner is supplied) and, given an end `force`, the cantilever
/// deflection test.
///
/// # Errors
///
/// Fails if any derivation's preconditions do not hold; the rod must have
/// uniform material parameters and at least three nodes.
#[instrument(skip_all, name = "analyze_workflow")]
pub fn run(
    rod: &RodTrajectory,
    config: &AnalysisConfig,
    collaborators: &Collaborators,
    force: Option<f64>,
    reporter: &ProgressReporter,
) -> Result<AnalysisReport, AnalysisError> {
    info!(
        nodes = rod.num_elements(),
        frames = rod.num_frames(),
        "Starting rod analysis workflow."
    );
    let mut analysis = RodAnalysis::new(rod, config.clone()).with_reporter(reporter);
    if let Some(aligner) = collaborators.aligner() {
        analysis = analysis.with_aligner(aligner);
    }

    // === Phase 1: Elastic energies ===
    let equipartition = analysis.equipartition()?;
    let energies = summarize_energies(&equipartition);
    info!(
        stretch = energies.mean_stretch,
        bend = energies.mean_bend,
        twist = energies.mean_twist,
        "Energies computed."
    );

    // === Phase 2: Persistence length ===
    reporter.report(Progress::PhaseStart {
        name: "Persistence Length",
    });
    let persistence = analysis.persistence_length()?.clone();
    let segments = analysis.persistence_segments()?;
    let fjc_mean = mean(&segments.fjc_from_mean);
    let wlc_mean = mean(&segments.wlc_from_mean);
    let persistence = PersistenceSummary {
        mean_cos: persistence.mean_cos,
        saturated: persistence.saturated,
        mean_length: mean(&persistence.per_frame),
        fjc_mean,
        wlc_mean,
        analytical: analysis.analytical_persistence_length()?,
        detail: Some(persistence),
    };
    reporter.report(Progress::PhaseFinish);

    // === Phase 3: RMSD ===
    reporter.report(Progress::PhaseStart { name: "RMSD" });
    let aligned = collaborators.aligner().is_some();
    let per_node = analysis.node_rmsd(aligned)?;
    let per_frame = analysis.time_rmsd(aligned, None)?;
    let rmsd = RmsdSummary {
        aligner: collaborators.aligner().map(|a| a.name()),
        mean: mean(&per_frame),
        per_node,
        per_frame,
    };
    reporter.report(Progress::PhaseFinish);

    // === Phase 4: Deflection (optional) ===
    let deflection = match force {
        Some(force) => Some(DeflectionSummary {
            force,
            deflection: analysis.deflection(),
            ei: analysis.ei_from_deflection(force),
            analytical_deflection: analysis.analytical_deflection(force)?,
        }),
        None => None,
    };

    let report = AnalysisReport {
        nodes: rod.num_elements(),
        frames: rod.num_frames(),
        backend: config.backend.instantiate().name(),
        energies,
        persistence,
        rmsd,
        deflection,
    };
    info!(
        persistence_length = report.persistence.mean_length,
        mean_rmsd = report.rmsd.mean,
        "Workflow complete."
    );
    Ok(report)
}

fn summarize_energies(equipartition: &Equipartition) -> EnergySummary {
    let stretch = equipartition.stretch.frame_means();
    let bend = equipartition.bend.frame_means();
    let per_frame: Vec<FrameEnergies> = stretch
        .iter()
        .zip(&bend)
        .zip(&equipartition.average_twist)
        .enumerate()
        .map(|(frame, ((&stretch, &bend), &twist))| FrameEnergies {
            frame,
            stretch,
            bend,
            twist,
        })
        .collect();
    EnergySummary {
        mean_stretch: mean(&stretch),
        mean_bend: mean(&bend),
        mean_twist: mean(&equipartition.average_twist),
        per_frame,
        ei: equipartition.ei,
        half_kbt: equipartition.half_kbt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::collaborators::KabschAligner;
    use crate::engine::config::MathBackend;
    use crate::engine::tasks::fixtures;
    use nalgebra::Vector3;

    fn jiggling_rod() -> RodTrajectory {
        let equil = fixtures::line(6);
        let frames: Vec<Vec<Vector3<f64>>> = (0..4)
            .map(|f| {
                equil
                    .iter()
                    .enumerate()
                    .map(|(i, p)| {
                        let phase = (i * 7 + f * 3) % 5;
                        p + Vector3::new(0.0, 0.01 * phase as f64, 0.005 * (phase % 2) as f64)
                    })
                    .collect()
            })
            .collect();
        fixtures::rod_from(&vec![equil; 4], &frames)
    }

    fn config() -> AnalysisConfig {
        AnalysisConfig::builder()
            .backend(MathBackend::Reference)
            .temperature(300.0)
            .build()
            .unwrap()
    }

    #[test]
    fn report_covers_every_section() {
        let rod = jiggling_rod();
        let collaborators = Collaborators::new().with_aligner(Box::new(KabschAligner));
        let report = run(&rod, &config(), &collaborators, Some(0.5), &ProgressReporter::new()).unwrap();
        assert_eq!(report.nodes, 6);
        assert_eq!(report.frames, 4);
        assert_eq!(report.backend, "reference");
        assert_eq!(report.energies.per_frame.len(), 4);
        assert_eq!(report.energies.ei, fixtures::EI);
        assert!(report.energies.mean_bend > 0.0);
        assert_eq!(report.rmsd.aligner, Some("kabsch"));
        assert_eq!(report.rmsd.per_node.len(), 6);
        assert!(report.persistence.analytical.is_some());
        let deflection = report.deflection.unwrap();
        assert_eq!(deflection.deflection.len(), 4);
        assert_eq!(deflection.ei.len(), 4);
    }

    #[test]
    fn report_without_aligner_uses_raw_rmsd() {
        let rod = jiggling_rod();
        let report = run(&rod, &config(), &Collaborators::new(), None, &ProgressReporter::new()).unwrap();
        assert_eq!(report.rmsd.aligner, None);
        assert!(report.deflection.is_none());
        assert!(report.rmsd.mean > 0.0);
    }

    #[test]
    fn toml_summary_lists_headline_values() {
        let rod = jiggling_rod();
        let report = run(&rod, &config(), &Collaborators::new(), None, &ProgressReporter::new()).unwrap();
        let summary = report.to_toml_summary().unwrap();
        assert!(summary.contains("nodes = 6"));
        assert!(summary.contains("backend = \"reference\""));
        assert!(summary.contains("mean_rmsd"));
        assert!(!summary.contains("aligner"));
    }
}
