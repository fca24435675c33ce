use super::config::AnalysisConfig;
use super::progress::ProgressReporter;
use crate::core::math::rod::RodMath;
use crate::core::models::array::NodeArray;
use crate::core::models::trajectory::RodTrajectory;

/// Read-only view shared by every analysis task: the trajectory, its cached
/// segment vectors, the selected math backend and the reporter.
#[derive(Clone, Copy)]
pub struct AnalysisContext<'a> {
    pub rod: &'a RodTrajectory,
    pub p_i: &'a NodeArray,
    pub equil_p_i: &'a NodeArray,
    pub math: &'a dyn RodMath,
    pub config: &'a AnalysisConfig,
    pub reporter: &'a ProgressReporter<'a>,
}

impl<'a> AnalysisContext<'a> {
    pub fn new(
        rod: &'a RodTrajectory,
        p_i: &'a NodeArray,
        equil_p_i: &'a NodeArray,
        math: &'a dyn RodMath,
        config: &'a AnalysisConfig,
        reporter: &'a ProgressReporter<'a>,
    ) -> Self {
        Self {
            rod,
            p_i,
            equil_p_i,
            math,
            config,
            reporter,
        }
    }

    #[inline]
    pub fn num_frames(&self) -> usize {
        self.rod.num_frames()
    }

    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.rod.num_elements()
    }

    /// Number of interior nodes, each shared by two segments.
    #[inline]
    pub fn num_bend_sites(&self) -> usize {
        self.rod.num_elements().saturating_sub(2)
    }
}
