use super::cache::AnalysisCache;
use super::collaborators::RigidAligner;
use super::config::AnalysisConfig;
use super::context::AnalysisContext;
use super::error::AnalysisError;
use super::grid::{FrameGrid, mean};
use super::progress::{Progress, ProgressReporter};
use super::tasks::geometry::{self, LengthMeasure, NodeDisplacements};
use super::tasks::persistence::{self, PersistenceLength, SegmentPersistence};
use super::tasks::symmetry::{self, SymmetryKind, SymmetryReport};
use super::tasks::twist::{self, TwistResponse};
use super::tasks::{bending, parameters, rmsd, stretch};
use crate::core::math::analytical;
use crate::core::math::rod::RodMath;
use crate::core::math::vector;
use crate::core::models::array::NodeArray;
use crate::core::models::trajectory::{Configuration, RodTrajectory};
use serde::Serialize;
use std::cell::OnceCell;
use tracing::{debug, info};

/// Energies needed for an equipartition test, each `[frame][column]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Equipartition {
    pub stretch: FrameGrid,
    pub bend: FrameGrid,
    pub twist: FrameGrid,
    /// Twist energy averaged over the rod, one value per frame.
    pub average_twist: Vec<f64>,
    /// The rod's constant bending stiffness.
    pub ei: f64,
    /// `½ k_B T` at the configured temperature, if one was given.
    pub half_kbt: Option<f64>,
}

/// Lazily derives and caches the physical quantities of one rod trajectory.
///
/// The trajectory is borrowed for the lifetime of the analysis and never
/// modified; trajectory edits live in [`resample`](super::resample) and need
/// exclusive access. Every getter computes its quantity on first use and
/// returns the cached value afterwards.
///
/// # Examples
///
/// ```no_run
/// use rodkit::core::io::rodtraj::RodTrajFile;
/// use rodkit::core::io::traits::TrajectoryFile;
/// use rodkit::engine::analysis::RodAnalysis;
/// use rodkit::engine::config::{AnalysisConfig, MathBackend};
///
/// let (rod, _) = RodTrajFile::read_from_path("run.rodtraj")?;
/// let config = AnalysisConfig::builder().backend(MathBackend::Reference).build()?;
/// let mut analysis = RodAnalysis::new(&rod, config);
/// let stretch = analysis.stretch_energy()?.frame_means();
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct RodAnalysis<'a> {
    rod: &'a RodTrajectory,
    config: AnalysisConfig,
    math: Box<dyn RodMath>,
    aligner: Option<&'a dyn RigidAligner>,
    reporter: Option<&'a ProgressReporter<'a>>,
    silent: ProgressReporter<'static>,
    p_i: OnceCell<NodeArray>,
    equil_p_i: OnceCell<NodeArray>,
    cache: AnalysisCache,
}

impl<'a> RodAnalysis<'a> {
    /// Creates an analysis over `rod`, instantiating the configured math backend.
    pub fn new(rod: &'a RodTrajectory, config: AnalysisConfig) -> Self {
        let math = config.backend.instantiate();
        info!(
            nodes = rod.num_elements(),
            frames = rod.num_frames(),
            backend = math.name(),
            "Rod analysis created."
        );
        Self {
            rod,
            config,
            math,
            aligner: None,
            reporter: None,
            silent: ProgressReporter::new(),
            p_i: OnceCell::new(),
            equil_p_i: OnceCell::new(),
            cache: AnalysisCache::new(),
        }
    }

    /// Supplies the rigid aligner used by aligned RMSD.
    pub fn with_aligner(mut self, aligner: &'a dyn RigidAligner) -> Self {
        self.aligner = Some(aligner);
        self
    }

    pub fn with_reporter(mut self, reporter: &'a ProgressReporter<'a>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn rod(&self) -> &RodTrajectory {
        self.rod
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn cache(&self) -> &AnalysisCache {
        &self.cache
    }

    /// Drops every cached quantity so the next getter derives it again.
    pub fn invalidate(&mut self) {
        debug!(held = self.cache.len(), "Invalidating analysis cache.");
        self.cache.clear();
    }

    /// Current segment vectors `p_i`, `[frame][segment][3]`.
    pub fn segments(&self) -> &NodeArray {
        self.p_i
            .get_or_init(|| self.rod.segments(Configuration::Current))
    }

    /// Equilibrium segment vectors `p̃_i`, `[frame][segment][3]`.
    pub fn equilibrium_segments(&self) -> &NodeArray {
        self.equil_p_i
            .get_or_init(|| self.rod.segments(Configuration::Equilibrium))
    }

    fn context(&self) -> AnalysisContext<'_> {
        let reporter: &ProgressReporter<'_> = match self.reporter {
            Some(reporter) => reporter,
            None => &self.silent,
        };
        AnalysisContext::new(
            self.rod,
            self.segments(),
            self.equilibrium_segments(),
            self.math.as_ref(),
            &self.config,
            reporter,
        )
    }

    fn report(&self, event: Progress) {
        if let Some(reporter) = self.reporter {
            reporter.report(event);
        }
    }

    // --- Energies ---

    /// Stretch energy of every segment, `[frame][segment]`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Precondition`] if the stretch constant varies
    /// along the rod or through time, or a math error for a zero-length
    /// equilibrium segment.
    pub fn stretch_energy(&mut self) -> Result<&FrameGrid, AnalysisError> {
        let grid = match self.cache.stretch.take() {
            Some(grid) => grid,
            None => stretch::run(&self.context())?,
        };
        Ok(self.cache.stretch.insert(grid))
    }

    /// Bending energy evaluated in each segment's own material frame,
    /// `[frame][interior node]`.
    pub fn bending_energy_pointwise(&mut self) -> Result<&FrameGrid, AnalysisError> {
        let grid = match self.cache.pointwise_bend.take() {
            Some(grid) => grid,
            None => bending::pointwise(&self.context())?,
        };
        Ok(self.cache.pointwise_bend.insert(grid))
    }

    /// Bending energy evaluated in the mutual material frame of each
    /// interior node, `[frame][interior node]`.
    pub fn bending_energy_mutual(&mut self) -> Result<&FrameGrid, AnalysisError> {
        let grid = match self.cache.mutual_bend.take() {
            Some(grid) => grid,
            None => bending::mutual(&self.context(), None)?,
        };
        Ok(self.cache.mutual_bend.insert(grid))
    }

    /// Mutual-frame bending energy with the current mutual axis turned by
    /// `angle` radians about the mutual tangent. Not cached.
    pub fn bending_energy_mutual_rotated(&self, angle: f64) -> Result<FrameGrid, AnalysisError> {
        bending::mutual(&self.context(), Some(angle))
    }

    /// Twist energy of every adjacent segment pair and, when
    /// `record_amount` is set, the signed twist angle at each pair.
    pub fn twist(&mut self, record_amount: bool) -> Result<&TwistResponse, AnalysisError> {
        let response = match self.cache.twist.take() {
            Some(cached) if !record_amount || cached.amount.is_some() => cached,
            _ => twist::run(&self.context(), record_amount)?,
        };
        Ok(self.cache.twist.insert(response))
    }

    /// Stretch, mutual bend and twist energies plus the per-frame average
    /// twist energy.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Precondition`] unless the rod has a uniform,
    /// isotropic B matrix and uniform stretch constant, since equipartition
    /// is meaningless otherwise.
    pub fn equipartition(&mut self) -> Result<Equipartition, AnalysisError> {
        self.report(Progress::PhaseStart { name: "Equipartition" });
        let ei = self.constant_ei()?;
        let stretch = self.stretch_energy()?.clone();
        let bend = self.bending_energy_mutual()?.clone();
        let twist = self.twist(false)?.energy.clone();
        let average_twist = twist.frame_means();
        self.report(Progress::PhaseFinish);
        Ok(Equipartition {
            stretch,
            bend,
            twist,
            average_twist,
            ei,
            half_kbt: self.half_kbt(),
        })
    }

    /// Per-frame mean over the columns of a grid.
    pub fn whole_rod_average(grid: &FrameGrid) -> Vec<f64> {
        grid.frame_means()
    }

    // --- Material parameters ---

    /// The rod's single bending stiffness, read from frame 0.
    pub fn constant_ei(&self) -> Result<f64, AnalysisError> {
        parameters::constant_ei(self.rod)
    }

    /// A material parameter that is uniform over every node and frame
    /// (0 = stretch constant, 1 = twist constant).
    pub fn constant_parameter(&self, index: usize) -> Result<f64, AnalysisError> {
        parameters::constant_parameter(self.rod, index)
    }

    pub fn b_eigenvalues(&self) -> Result<Vec<[f64; 2]>, AnalysisError> {
        parameters::b_eigenvalues(self.rod)
    }

    // --- Correctness tests ---

    pub fn deflection(&self) -> Vec<f64> {
        persistence::deflection(&self.context())
    }

    pub fn ei_from_deflection(&self, force: f64) -> Vec<f64> {
        persistence::ei_from_deflection(&self.context(), force)
    }

    /// Tip deflection predicted for `force` by Euler beam theory, using the
    /// rod's constant EI and its equilibrium beam length.
    pub fn analytical_deflection(&self, force: f64) -> Result<f64, AnalysisError> {
        let ei = self.constant_ei()?;
        let r = self.rod.equil_r();
        let length = vector::distance(&r.vec3(0, 1), &r.vec3(0, self.rod.num_elements() - 1));
        Ok(analytical::analytical_deflection(force, length, ei))
    }

    pub fn persistence_length(&mut self) -> Result<&PersistenceLength, AnalysisError> {
        let result = match self.cache.persistence.take() {
            Some(result) => result,
            None => persistence::persistence_length(&self.context())?,
        };
        Ok(self.cache.persistence.insert(result))
    }

    pub fn persistence_segments(&mut self) -> Result<&SegmentPersistence, AnalysisError> {
        let result = match self.cache.segment_persistence.take() {
            Some(result) => result,
            None => persistence::persistence_segments(&self.context())?,
        };
        Ok(self.cache.segment_persistence.insert(result))
    }

    /// `EI / (k_B T)` at the configured temperature; `None` without one.
    pub fn analytical_persistence_length(&self) -> Result<Option<f64>, AnalysisError> {
        let Some(temperature) = self.config.temperature else {
            return Ok(None);
        };
        let ei = self.constant_ei()?;
        Ok(Some(analytical::analytical_persistence_length(ei, temperature)))
    }

    pub fn half_kbt(&self) -> Option<f64> {
        self.config.temperature.map(analytical::half_kbt)
    }

    /// Runs the stretch or bend symmetry test with the configured tolerances.
    pub fn symmetry_test(&self, kind: SymmetryKind) -> Result<SymmetryReport, AnalysisError> {
        symmetry::run(self.rod, &self.config.symmetry, kind)
    }

    pub fn stretch_symmetry_test(&self) -> Result<SymmetryReport, AnalysisError> {
        self.symmetry_test(SymmetryKind::Stretch)
    }

    pub fn bend_symmetry_test(&self) -> Result<SymmetryReport, AnalysisError> {
        self.symmetry_test(SymmetryKind::Bend)
    }

    // --- RMSD ---

    /// Equilibrium positions rigidly fitted onto each frame.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::MissingCollaborator`] if no aligner was supplied.
    pub fn aligned_equilibrium(&mut self) -> Result<&NodeArray, AnalysisError> {
        let aligned = match self.cache.aligned_equil.take() {
            Some(aligned) => aligned,
            None => {
                let aligner = self.aligner.ok_or(AnalysisError::MissingCollaborator {
                    name: "rigid aligner",
                    hint: "supply one with RodAnalysis::with_aligner, e.g. IcpAligner",
                })?;
                rmsd::aligned_equilibrium(&self.context(), aligner)?
            }
        };
        Ok(self.cache.aligned_equil.insert(aligned))
    }

    fn rmsd_reference(&mut self, aligned: bool) -> Result<&NodeArray, AnalysisError> {
        if aligned {
            self.aligned_equilibrium()
        } else {
            Ok(self.rod.equil_r())
        }
    }

    /// Time-averaged RMSD of every node against the equilibrium, aligned
    /// first when `aligned` is set.
    pub fn node_rmsd(&mut self, aligned: bool) -> Result<Vec<f64>, AnalysisError> {
        let current = self.rod.current_r();
        let reference = self.rmsd_reference(aligned)?;
        Ok(rmsd::node_rmsd(current, reference))
    }

    /// Node-averaged RMSD of each frame, optionally only before `max_frame`.
    pub fn time_rmsd(
        &mut self,
        aligned: bool,
        max_frame: Option<usize>,
    ) -> Result<Vec<f64>, AnalysisError> {
        let current = self.rod.current_r();
        let reference = self.rmsd_reference(aligned)?;
        Ok(rmsd::time_rmsd(current, reference, max_frame))
    }

    // --- Geometry ---

    pub fn delta_r(&mut self) -> Result<&NodeDisplacements, AnalysisError> {
        let delta = match self.cache.delta_r.take() {
            Some(delta) => delta,
            None => geometry::delta_r(self.rod)?,
        };
        Ok(self.cache.delta_r.insert(delta))
    }

    /// `L_i` of every interior node, `[frame][interior node]`.
    pub fn integration_lengths(&mut self) -> &FrameGrid {
        let lengths = match self.cache.integration_lengths.take() {
            Some(lengths) => lengths,
            None => geometry::integration_lengths(&self.context()),
        };
        self.cache.integration_lengths.insert(lengths)
    }

    pub fn absolute_length(
        &self,
        start: usize,
        end: usize,
        frame: usize,
        configuration: Configuration,
        measure: LengthMeasure,
    ) -> Result<f64, AnalysisError> {
        geometry::absolute_length(&self.context(), start, end, frame, configuration, measure)
    }

    pub fn starting_length(&self) -> f64 {
        geometry::starting_length(self.rod)
    }

    /// Mean of the whole-rod averages of a grid over every frame.
    pub fn overall_mean(grid: &FrameGrid) -> f64 {
        mean(&grid.frame_means())
    }
}
