use super::geometry::{LengthMeasure, absolute_length};
use crate::core::math::vector;
use crate::core::models::trajectory::Configuration;
use crate::engine::context::AnalysisContext;
use crate::engine::error::AnalysisError;
use crate::engine::grid::{FrameGrid, mean};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

/// Persistence length from the end-to-end tangent correlation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistenceLength {
    /// `⟨cos θ⟩` between the first and last segment, averaged over all frames.
    pub mean_cos: f64,
    /// The per-frame `cos θ` that went into the average.
    pub cos_theta: Vec<f64>,
    /// Contour length of each frame between the first and second-to-last
    /// segment midpoints.
    pub contour_lengths: Vec<f64>,
    /// `P = -L / ln⟨cos θ⟩` for every frame.
    pub per_frame: Vec<f64>,
    /// Set when the ends are perfectly correlated and `P` is unbounded.
    pub saturated: bool,
}

/// Freely-jointed-chain and worm-like-chain persistence estimates from the
/// correlation of each adjacent segment pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentPersistence {
    pub cos_theta: FrameGrid,
    /// `-1 / ln(cos θ)` per frame and site.
    pub fjc: FrameGrid,
    /// `2 / acos(cos θ)²` per frame and site.
    pub wlc: FrameGrid,
    /// FJC estimate from the frame-averaged `cos θ` of each site.
    pub fjc_from_mean: Vec<f64>,
    /// WLC estimate from the frame-averaged angle of each site.
    pub wlc_from_mean: Vec<f64>,
}

#[instrument(skip_all, name = "persistence_length_task")]
pub fn persistence_length(context: &AnalysisContext) -> Result<PersistenceLength, AnalysisError> {
    let n = context.num_nodes();
    if n < 3 {
        return Err(AnalysisError::precondition(
            "at least three nodes",
            format!("persistence length needs two distinct end segments, rod has {} nodes", n),
        ));
    }
    let last = context.rod.num_segments() - 1;

    let cos_theta = (0..context.num_frames())
        .map(|frame| {
            let a = context.p_i.vec3(frame, 0);
            let b = context.p_i.vec3(frame, last);
            vector::cos_theta(&vector::normalize(&a)?, &vector::normalize(&b)?)
        })
        .collect::<Result<Vec<_>, _>>()?;
    let mean_cos = mean(&cos_theta);

    let contour_lengths = (0..context.num_frames())
        .map(|frame| {
            absolute_length(
                context,
                0,
                n - 2,
                frame,
                Configuration::Current,
                LengthMeasure::Contour,
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    if mean_cos <= 0.0 {
        return Err(AnalysisError::precondition(
            "positive end-to-end correlation",
            format!("<cos θ> = {} has no real logarithm", mean_cos),
        ));
    }

    let saturated = mean_cos >= 1.0;
    let per_frame: Vec<f64> = if saturated {
        warn!("End segments are perfectly correlated; persistence length is unbounded.");
        vec![f64::INFINITY; contour_lengths.len()]
    } else {
        let log = mean_cos.ln();
        contour_lengths.iter().map(|l| -l / log).collect()
    };

    if let (Some(&p), Some(&l)) = (per_frame.last(), contour_lengths.last()) {
        if p > 1e-4 {
            debug!(contour_length = l, mean_cos, persistence_length = p, "Persistence length diagnostics.");
        }
    }
    info!(mean_cos, saturated, "Persistence length computed.");

    Ok(PersistenceLength {
        mean_cos,
        cos_theta,
        contour_lengths,
        per_frame,
        saturated,
    })
}

#[instrument(skip_all, name = "persistence_segments_task")]
pub fn persistence_segments(context: &AnalysisContext) -> Result<SegmentPersistence, AnalysisError> {
    let sites = context.num_bend_sites();
    let num_frames = context.num_frames();

    let cos_theta = FrameGrid::try_from_rows(num_frames, sites, |frame| {
        (0..sites)
            .map(|site| {
                vector::cos_theta(&context.p_i.vec3(frame, site), &context.p_i.vec3(frame, site + 1))
                    .map_err(AnalysisError::from)
            })
            .collect()
    })?;

    let mut fjc = FrameGrid::zeros(num_frames, sites);
    let mut wlc = FrameGrid::zeros(num_frames, sites);
    for frame in 0..num_frames {
        for site in 0..sites {
            let c = cos_theta.get(frame, site);
            fjc.set(frame, site, fjc_estimate(c));
            wlc.set(frame, site, wlc_from_angle(clamped_acos(c)));
        }
    }

    let fjc_from_mean = (0..sites)
        .map(|site| fjc_estimate(mean(&cos_theta.column(site))))
        .collect();
    let wlc_from_mean = (0..sites)
        .map(|site| {
            let angles: Vec<f64> = cos_theta.column(site).into_iter().map(clamped_acos).collect();
            wlc_from_angle(mean(&angles))
        })
        .collect();

    info!(sites, "Segment persistence estimates computed.");
    Ok(SegmentPersistence {
        cos_theta,
        fjc,
        wlc,
        fjc_from_mean,
        wlc_from_mean,
    })
}

/// `-1 / ln(cos θ)`, unbounded for perfectly aligned segments and zero once
/// the correlation is lost.
fn fjc_estimate(cos: f64) -> f64 {
    if cos >= 1.0 {
        f64::INFINITY
    } else if cos <= 0.0 {
        0.0
    } else {
        -1.0 / cos.ln()
    }
}

fn wlc_from_angle(angle: f64) -> f64 {
    if angle == 0.0 {
        f64::INFINITY
    } else {
        2.0 / (angle * angle)
    }
}

fn clamped_acos(cos: f64) -> f64 {
    cos.clamp(-1.0, 1.0).acos()
}

/// Vertical (`y`) displacement of the last node from its equilibrium, per frame.
pub fn deflection(context: &AnalysisContext) -> Vec<f64> {
    let last = context.num_nodes() - 1;
    let rod = context.rod;
    (0..context.num_frames())
        .map(|frame| rod.current_r().get(frame, last, 1) - rod.equil_r().get(frame, last, 1))
        .collect()
}

/// Bending stiffness per frame from the cantilever relation `W = P·L³/(3·EI)`.
///
/// `L` is the equilibrium distance from the second node to the last node on
/// frame 0. A frame with no deflection gives an unbounded EI.
pub fn ei_from_deflection(context: &AnalysisContext, force: f64) -> Vec<f64> {
    let rod = context.rod;
    let last = context.num_nodes() - 1;
    let beam_length = vector::distance(&rod.equil_r().vec3(0, 1), &rod.equil_r().vec3(0, last));
    deflection(context)
        .into_iter()
        .map(|w| {
            if w == 0.0 {
                f64::INFINITY
            } else {
                force * beam_length.powi(3) / (3.0 * w.abs())
            }
        })
        .collect()
}
