//! External operations the engine delegates: rigid alignment of node sets and
//! node-count simplification. Each is a trait so callers can substitute their
//! own implementation; built-in ones are provided for both.

use crate::core::models::array::NodeArray;
use nalgebra::{Matrix3, Matrix4, Vector3};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CollaboratorError {
    #[error("Point set is empty")]
    EmptyPointSet,
    #[error("Paired point sets differ in length: {source_len} vs {target_len}")]
    LengthMismatch { source_len: usize, target_len: usize },
    #[error("SVD did not converge while fitting a rotation")]
    SvdFailed,
    #[error("Target length must be at least 1")]
    ZeroTarget,
    #[error("No block size brings {nodes} nodes within {margin} of {target}")]
    NoAcceptableStep {
        nodes: usize,
        target: usize,
        margin: f64,
    },
}

/// A rigid transform taking the source points onto the target, with the
/// distance from each transformed source point to its matched target.
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    pub transform: Matrix4<f64>,
    pub residuals: Vec<f64>,
}

impl Alignment {
    pub fn apply(&self, point: &Vector3<f64>) -> Vector3<f64> {
        self.transform
            .transform_point(&nalgebra::Point3::from(*point))
            .coords
    }
}

pub trait RigidAligner: Send + Sync {
    fn name(&self) -> &'static str;

    fn align(
        &self,
        source: &[Vector3<f64>],
        target: &[Vector3<f64>],
        max_iterations: usize,
        tolerance: f64,
    ) -> Result<Alignment, CollaboratorError>;
}

pub trait NodeSimplifier: Send + Sync {
    fn name(&self) -> &'static str;

    /// Reduces `array` to about `target_length` nodes per frame. Every call
    /// with the same node count and arguments must produce the same node count.
    fn simplify(
        &self,
        array: &NodeArray,
        target_length: usize,
        margin: f64,
    ) -> Result<NodeArray, CollaboratorError>;
}

/// Least-squares rigid fit of index-paired points (Kabsch).
#[derive(Debug, Default, Clone, Copy)]
pub struct KabschAligner;

impl RigidAligner for KabschAligner {
    fn name(&self) -> &'static str {
        "kabsch"
    }

    fn align(
        &self,
        source: &[Vector3<f64>],
        target: &[Vector3<f64>],
        _max_iterations: usize,
        _tolerance: f64,
    ) -> Result<Alignment, CollaboratorError> {
        let transform = kabsch(source, target)?;
        let residuals = source
            .iter()
            .zip(target)
            .map(|(s, t)| (transform_point(&transform, s) - t).norm())
            .collect();
        Ok(Alignment {
            transform,
            residuals,
        })
    }
}

/// Iterative closest point: alternately matches every source point to its
/// nearest target and refits with Kabsch, until the mean residual stops moving.
#[derive(Debug, Default, Clone, Copy)]
pub struct IcpAligner;

impl RigidAligner for IcpAligner {
    fn name(&self) -> &'static str {
        "icp"
    }

    fn align(
        &self,
        source: &[Vector3<f64>],
        target: &[Vector3<f64>],
        max_iterations: usize,
        tolerance: f64,
    ) -> Result<Alignment, CollaboratorError> {
        if source.is_empty() || target.is_empty() {
            return Err(CollaboratorError::EmptyPointSet);
        }
        let mut moved = source.to_vec();
        let mut total = Matrix4::identity();
        let mut previous_error = f64::INFINITY;
        let mut residuals = Vec::new();

        for iteration in 0..max_iterations {
            let (matched, distances) = closest_points(&moved, target);
            let mean_error = distances.iter().sum::<f64>() / distances.len() as f64;
            residuals = distances;
            if (previous_error - mean_error).abs() < tolerance {
                debug!(iteration, mean_error, "ICP converged.");
                break;
            }
            previous_error = mean_error;

            let step = kabsch(&moved, &matched)?;
            for p in &mut moved {
                *p = transform_point(&step, p);
            }
            total = step * total;
        }

        Ok(Alignment {
            transform: total,
            residuals,
        })
    }
}

/// Averages contiguous blocks of nodes. The block size is the one whose
/// resulting node count is closest to the target.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlockAverageSimplifier;

impl BlockAverageSimplifier {
    fn step_for(num_nodes: usize, target: usize, margin: f64) -> Result<usize, CollaboratorError> {
        if target == 0 {
            return Err(CollaboratorError::ZeroTarget);
        }
        let best = (1..=num_nodes.max(1))
            .min_by_key(|&step| num_nodes.div_ceil(step).abs_diff(target))
            .unwrap_or(1);
        let achieved = num_nodes.div_ceil(best);
        if achieved.abs_diff(target) as f64 > margin * target as f64 {
            return Err(CollaboratorError::NoAcceptableStep {
                nodes: num_nodes,
                target,
                margin,
            });
        }
        Ok(best)
    }
}

impl NodeSimplifier for BlockAverageSimplifier {
    fn name(&self) -> &'static str {
        "block-average"
    }

    fn simplify(
        &self,
        array: &NodeArray,
        target_length: usize,
        margin: f64,
    ) -> Result<NodeArray, CollaboratorError> {
        let nodes = array.num_nodes();
        let width = array.width();
        let step = Self::step_for(nodes, target_length, margin)?;
        let blocks = nodes.div_ceil(step);

        let mut out = NodeArray::zeros(array.num_frames(), blocks, width);
        for frame in 0..array.num_frames() {
            for block in 0..blocks {
                let members = block * step..((block + 1) * step).min(nodes);
                let count = members.len() as f64;
                for component in 0..width {
                    let sum: f64 = members
                        .clone()
                        .map(|node| array.get(frame, node, component))
                        .sum();
                    out.set(frame, block, component, sum / count);
                }
            }
        }
        Ok(out)
    }
}

/// The collaborators available to an analysis run.
#[derive(Default)]
pub struct Collaborators {
    pub aligner: Option<Box<dyn RigidAligner>>,
    pub simplifier: Option<Box<dyn NodeSimplifier>>,
}

impl Collaborators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_aligner(mut self, aligner: Box<dyn RigidAligner>) -> Self {
        self.aligner = Some(aligner);
        self
    }

    pub fn with_simplifier(mut self, simplifier: Box<dyn NodeSimplifier>) -> Self {
        self.simplifier = Some(simplifier);
        self
    }

    /// Resolves a built-in aligner by name; `"none"` yields no aligner.
    pub fn aligner_by_name(name: &str) -> Option<Option<Box<dyn RigidAligner>>> {
        match name.to_ascii_lowercase().as_str() {
            "kabsch" => Some(Some(Box::new(KabschAligner))),
            "icp" => Some(Some(Box::new(IcpAligner))),
            "none" => Some(None),
            _ => None,
        }
    }

    /// Resolves a built-in simplifier by name; `"none"` yields no simplifier.
    pub fn simplifier_by_name(name: &str) -> Option<Option<Box<dyn NodeSimplifier>>> {
        match name.to_ascii_lowercase().as_str() {
            "block-average" => Some(Some(Box::new(BlockAverageSimplifier))),
            "none" => Some(None),
            _ => None,
        }
    }

    pub fn aligner(&self) -> Option<&dyn RigidAligner> {
        self.aligner.as_deref()
    }

    pub fn simplifier(&self) -> Option<&dyn NodeSimplifier> {
        self.simplifier.as_deref()
    }
}

fn transform_point(transform: &Matrix4<f64>, p: &Vector3<f64>) -> Vector3<f64> {
    transform
        .transform_point(&nalgebra::Point3::from(*p))
        .coords
}

fn centroid(points: &[Vector3<f64>]) -> Vector3<f64> {
    points.iter().sum::<Vector3<f64>>() / points.len() as f64
}

fn kabsch(source: &[Vector3<f64>], target: &[Vector3<f64>]) -> Result<Matrix4<f64>, CollaboratorError> {
    if source.is_empty() || target.is_empty() {
        return Err(CollaboratorError::EmptyPointSet);
    }
    if source.len() != target.len() {
        return Err(CollaboratorError::LengthMismatch {
            source_len: source.len(),
            target_len: target.len(),
        });
    }
    let source_centroid = centroid(source);
    let target_centroid = centroid(target);

    let mut h = Matrix3::zeros();
    for (s, t) in source.iter().zip(target) {
        h += (s - source_centroid) * (t - target_centroid).transpose();
    }

    let svd = h.svd(true, true);
    let u = svd.u.ok_or(CollaboratorError::SvdFailed)?;
    let v_t = svd.v_t.ok_or(CollaboratorError::SvdFailed)?;

    let mut rotation = v_t.transpose() * u.transpose();
    if rotation.determinant() < 0.0 {
        let mut v = v_t.transpose();
        for i in 0..3 {
            v[(i, 2)] = -v[(i, 2)];
        }
        rotation = v * u.transpose();
    }

    let translation = target_centroid - rotation * source_centroid;
    let mut transform = rotation.to_homogeneous();
    transform.fixed_view_mut::<3, 1>(0, 3).copy_from(&translation);
    Ok(transform)
}

fn closest_points(points: &[Vector3<f64>], target: &[Vector3<f64>]) -> (Vec<Vector3<f64>>, Vec<f64>) {
    points
        .iter()
        .map(|p| {
            target
                .iter()
                .map(|t| (*t, (t - p).norm()))
                .fold((target[0], f64::INFINITY), |best, candidate| {
                    if candidate.1 < best.1 { candidate } else { best }
                })
        })
        .unzip()
}
