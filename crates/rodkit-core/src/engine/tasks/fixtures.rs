//! Hand-built rods shared by the task test suites.

use crate::core::math::rod::RodMath;
use crate::core::models::array::NodeArray;
use crate::core::models::channel::Channel;
use crate::core::models::trajectory::{Configuration, RodTrajectory};
use crate::engine::config::{AnalysisConfig, MathBackend};
use crate::engine::context::AnalysisContext;
use crate::engine::progress::ProgressReporter;
use nalgebra::Vector3;

pub const K: f64 = 2.0;
pub const BETA: f64 = 3.0;
pub const RADIUS: f64 = 0.5;
pub const EI: f64 = 1.5;

/// Nodes at unit spacing along x.
pub fn line(num_nodes: usize) -> Vec<Vector3<f64>> {
    (0..num_nodes).map(|i| Vector3::new(i as f64, 0.0, 0.0)).collect()
}

/// Builds a rod from per-frame positions. Material axes point along z,
/// material parameters are `[K, BETA, RADIUS]` and every B is `EI · I`.
pub fn rod_from(equil: &[Vec<Vector3<f64>>], current: &[Vec<Vector3<f64>>]) -> RodTrajectory {
    let num_frames = current.len();
    let num_nodes = current[0].len();
    let axes: Vec<Vec<Vector3<f64>>> = vec![vec![Vector3::z(); num_nodes]; num_frames];

    let channels = std::array::from_fn(|i| {
        let channel = Channel::ALL[i];
        match channel {
            Channel::EquilR => NodeArray::from_vectors(equil).unwrap(),
            Channel::CurrentR => NodeArray::from_vectors(current).unwrap(),
            Channel::EquilM | Channel::CurrentM => NodeArray::from_vectors(&axes).unwrap(),
            Channel::MaterialParams => filled(num_frames, num_nodes, &[K, BETA, RADIUS]),
            Channel::BMatrix => filled(num_frames, num_nodes, &[EI, 0.0, 0.0, EI]),
            other => NodeArray::zeros(num_frames, num_nodes, other.default_width()),
        }
    });
    RodTrajectory::from_channels(0, 1, channels).unwrap()
}

/// A straight rod that never moves away from its equilibrium.
pub fn straight_rod(num_nodes: usize, num_frames: usize) -> RodTrajectory {
    let frames = vec![line(num_nodes); num_frames];
    rod_from(&frames, &frames)
}

fn filled(num_frames: usize, num_nodes: usize, node: &[f64]) -> NodeArray {
    let data = node
        .iter()
        .copied()
        .cycle()
        .take(num_frames * num_nodes * node.len())
        .collect();
    NodeArray::from_data(num_frames, num_nodes, node.len(), data).unwrap()
}

/// Owns everything an [`AnalysisContext`] borrows.
pub struct Harness {
    pub rod: RodTrajectory,
    p_i: NodeArray,
    equil_p_i: NodeArray,
    pub config: AnalysisConfig,
    reporter: ProgressReporter<'static>,
    math: Box<dyn RodMath>,
}

impl Harness {
    pub fn new(rod: RodTrajectory) -> Self {
        let config = AnalysisConfig::builder()
            .backend(MathBackend::Reference)
            .build()
            .unwrap();
        Self {
            p_i: rod.segments(Configuration::Current),
            equil_p_i: rod.segments(Configuration::Equilibrium),
            math: config.backend.instantiate(),
            rod,
            config,
            reporter: ProgressReporter::new(),
        }
    }

    pub fn context(&self) -> AnalysisContext<'_> {
        AnalysisContext::new(
            &self.rod,
            &self.p_i,
            &self.equil_p_i,
            self.math.as_ref(),
            &self.config,
            &self.reporter,
        )
    }
}
