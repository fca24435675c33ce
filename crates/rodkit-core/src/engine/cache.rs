use super::grid::FrameGrid;
use super::tasks::geometry::NodeDisplacements;
use super::tasks::persistence::{PersistenceLength, SegmentPersistence};
use super::tasks::twist::TwistResponse;
use crate::core::models::array::NodeArray;

/// Derived quantities computed so far. `None` means "not yet computed".
/// The trajectory is borrowed immutably for the lifetime of the analysis,
/// so values only leave the cache through an explicit
/// [`RodAnalysis::invalidate`](super::analysis::RodAnalysis::invalidate).
#[derive(Debug, Default, Clone)]
pub struct AnalysisCache {
    pub(crate) stretch: Option<FrameGrid>,
    pub(crate) pointwise_bend: Option<FrameGrid>,
    pub(crate) mutual_bend: Option<FrameGrid>,
    pub(crate) twist: Option<TwistResponse>,
    pub(crate) persistence: Option<PersistenceLength>,
    pub(crate) segment_persistence: Option<SegmentPersistence>,
    pub(crate) aligned_equil: Option<NodeArray>,
    pub(crate) delta_r: Option<NodeDisplacements>,
    pub(crate) integration_lengths: Option<FrameGrid>,
}

impl AnalysisCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of quantities currently held.
    pub fn len(&self) -> usize {
        [
            self.stretch.is_some(),
            self.pointwise_bend.is_some(),
            self.mutual_bend.is_some(),
            self.twist.is_some(),
            self.persistence.is_some(),
            self.segment_persistence.is_some(),
            self.aligned_equil.is_some(),
            self.delta_r.is_some(),
            self.integration_lengths.is_some(),
        ]
        .into_iter()
        .filter(|&held| held)
        .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
