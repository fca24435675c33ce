use crate::core::math::analytical::approximately_equal;
use crate::core::math::vector;
use crate::core::models::trajectory::{Configuration, RodTrajectory};
use crate::engine::config::SymmetryTolerances;
use crate::engine::error::AnalysisError;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, instrument, warn};

const STRETCH_ENERGY: usize = 0;
const BEND_ENERGY: usize = 1;
const MIN_NODES: usize = 5;
const MIN_FRAMES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SymmetryKind {
    Stretch,
    Bend,
}

impl fmt::Display for SymmetryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymmetryKind::Stretch => write!(f, "stretch"),
            SymmetryKind::Bend => write!(f, "bend"),
        }
    }
}

/// Outcome of a symmetry test. A failed check is a result, not an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymmetryReport {
    pub kind: SymmetryKind,
    pub passed: bool,
    pub failures: Vec<String>,
}

/// Checks that a rod built from a mirror-symmetric test setup stays
/// mirror-symmetric about its central node.
///
/// The rod needs an odd node count of at least five and at least three
/// frames: frame 0 is the initial state, frame 1 the perturbed state whose
/// averaged perturbation energies are compared, frame 2 the state after one
/// step of dynamics.
///
/// Each test reads its own column of the by-type averaged perturbation
/// energies: [`SymmetryKind::Stretch`] compares column 0 (stretch) and
/// [`SymmetryKind::Bend`] compares column 1 (bend). Trajectories whose
/// stretch response was recorded only in the bend column will fail the
/// stretch test.
///
/// # Errors
///
/// Returns [`AnalysisError::Precondition`] if the rod is too short, has an
/// even node count or too few frames, or lacks a bend energy column.
#[instrument(skip_all, name = "symmetry_task", fields(kind = %kind))]
pub fn run(
    rod: &RodTrajectory,
    tolerances: &SymmetryTolerances,
    kind: SymmetryKind,
) -> Result<SymmetryReport, AnalysisError> {
    let n = rod.num_elements();
    if n < MIN_NODES || n % 2 == 0 {
        return Err(AnalysisError::precondition(
            "odd node count of at least five",
            format!("rod has {} nodes", n),
        ));
    }
    if rod.num_frames() < MIN_FRAMES {
        return Err(AnalysisError::precondition(
            "at least three frames",
            format!("rod has {} frames", rod.num_frames()),
        ));
    }
    let energies = rod.averaged_perturbation_energies().by_type;
    if energies.width() <= BEND_ENERGY {
        return Err(AnalysisError::precondition(
            "stretch and bend energy columns",
            format!("perturbation energies carry {} columns", energies.width()),
        ));
    }

    let mut checks = Checks::default();
    let r = rod.positions(Configuration::Current);
    let center = (n - 1) / 2;

    match kind {
        SymmetryKind::Stretch => {
            let end = (energies.get(1, 0, STRETCH_ENERGY), energies.get(1, n - 1, STRETCH_ENERGY));
            checks.require(
                approximately_equal(end.0, end.1, tolerances.stretch_energy),
                || format!("End stretch energies are not symmetric: first node {}, last node {}", end.0, end.1),
            );
            let inner = (energies.get(1, 1, STRETCH_ENERGY), energies.get(1, n - 2, STRETCH_ENERGY));
            checks.require(
                approximately_equal(inner.0, inner.1, tolerances.stretch_energy),
                || format!(
                    "Opposite stretch energies are not symmetric: second node {}, second-to-last node {}",
                    inner.0, inner.1
                ),
            );

            let (before, after) = (r.get(1, center, 0), r.get(2, center, 0));
            checks.require(
                approximately_equal(before, after, tolerances.central_node),
                || format!("The central node moves along the rod: x went from {} to {}", before, after),
            );

            let p = rod.segments(Configuration::Current);
            let bent = (0..rod.num_segments()).find(|&i| {
                vector::normalize(&p.vec3(2, i)).map_or(true, |t| t.dot(&Vector3::x()) < tolerances.straightness)
            });
            checks.require(bent.is_none(), || {
                format!("The rod doesn't stay straight: segment {:?} leaves the x axis", bent)
            });

            let left = r.vec3(2, 0) - r.vec3(1, 0);
            let right = r.vec3(2, n - 1) - r.vec3(1, n - 1);
            let dot = unit_dot(&left, &right);
            checks.require(
                dot.is_some_and(|d| d <= tolerances.opposite_motion),
                || format!(
                    "The end nodes are not travelling in opposite directions: first {:?}, last {:?}",
                    left.as_slice(),
                    right.as_slice()
                ),
            );
        }
        SymmetryKind::Bend => {
            let sides = (energies.get(1, 1, BEND_ENERGY), energies.get(1, n - 2, BEND_ENERGY));
            checks.require(
                approximately_equal(sides.0, sides.1, tolerances.bend_energy),
                || format!(
                    "Bend energies are not symmetric: node 1 {}, node {} {}",
                    sides.0,
                    n - 2,
                    sides.1
                ),
            );

            let drop = r.vec3(1, center) - r.vec3(0, center);
            let down = unit_dot(&drop, &-Vector3::y());
            checks.require(
                down.is_some_and(|d| d >= tolerances.straightness),
                || format!("The central node is not moving straight down: delta {:?}", drop.as_slice()),
            );

            let left = r.vec3(2, 1) - r.vec3(1, 1);
            let right = r.vec3(2, n - 2) - r.vec3(1, n - 2);
            checks.require(
                approximately_equal(left.x, -right.x, tolerances.side_dynamics),
                || format!(
                    "Mirrored side nodes are not moving in opposite directions: {:?} vs {:?}",
                    left.as_slice(),
                    right.as_slice()
                ),
            );
        }
    }

    let report = SymmetryReport {
        kind,
        passed: checks.failures.is_empty(),
        failures: checks.failures,
    };
    info!(passed = report.passed, failed_checks = report.failures.len(), "Symmetry test finished.");
    Ok(report)
}

fn unit_dot(a: &Vector3<f64>, b: &Vector3<f64>) -> Option<f64> {
    Some(vector::normalize(a).ok()?.dot(&vector::normalize(b).ok()?))
}

#[derive(Default)]
struct Checks {
    failures: Vec<String>,
}

impl Checks {
    fn require(&mut self, ok: bool, detail: impl FnOnce() -> String) {
        if !ok {
            let detail = detail();
            warn!("{}", detail);
            self.failures.push(detail);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::channel::Channel;
    use crate::engine::tasks::fixtures;

    fn set_energy(rod: &mut RodTrajectory, node: usize, energy: [f64; 3]) {
        for channel in Channel::PERTURBATIONS {
            rod.set_node(channel, 1, node, &energy).unwrap();
        }
    }

    fn stretch_rod(right_end: f64, node3_energy: f64) -> RodTrajectory {
        let xs = |values: [f64; 5]| -> Vec<Vector3<f64>> {
            values.iter().map(|&x| Vector3::new(x, 0.0, 0.0)).collect()
        };
        let equil = vec![fixtures::line(5); 3];
        let current = vec![
            fixtures::line(5),
            xs([-0.1, 1.0, 2.0, 3.0, 4.1]),
            xs([-0.05, 1.0, 2.0, 3.0, right_end]),
        ];
        let mut rod = fixtures::rod_from(&equil, &current);
        set_energy(&mut rod, 0, [0.5, 0.0, 0.0]);
        set_energy(&mut rod, 1, [0.2, 0.0, 0.0]);
        set_energy(&mut rod, 3, [node3_energy, 0.0, 0.0]);
        set_energy(&mut rod, 4, [0.5, 0.0, 0.0]);
        rod
    }

    fn bend_rod(symmetric: bool) -> RodTrajectory {
        let equil = vec![fixtures::line(5); 3];
        let mut kinked = fixtures::line(5);
        kinked[2] = Vector3::new(2.0, -0.1, 0.0);
        let mut relaxed = kinked.clone();
        relaxed[1] = Vector3::new(1.01, -0.02, 0.0);
        if symmetric {
            relaxed[3] = Vector3::new(2.99, -0.02, 0.0);
        }
        let mut rod = fixtures::rod_from(&equil, &[fixtures::line(5), kinked, relaxed]);
        set_energy(&mut rod, 1, [0.0, 0.3, 0.0]);
        set_energy(&mut rod, 3, [0.0, if symmetric { 0.3 } else { 0.1 }, 0.0]);
        rod
    }

    #[test]
    fn symmetric_stretch_passes() {
        let report = run(&stretch_rod(4.05, 0.2), &SymmetryTolerances::default(), SymmetryKind::Stretch).unwrap();
        assert!(report.passed, "{:?}", report.failures);
        assert!(report.failures.is_empty());
    }

    #[test]
    fn asymmetric_stretch_energies_fail() {
        let report = run(&stretch_rod(4.05, 0.25), &SymmetryTolerances::default(), SymmetryKind::Stretch).unwrap();
        assert!(!report.passed);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].contains("Opposite stretch energies"));
    }

    #[test]
    fn stretch_with_ends_moving_together_fails() {
        let report = run(&stretch_rod(4.15, 0.2), &SymmetryTolerances::default(), SymmetryKind::Stretch).unwrap();
        assert!(!report.passed);
        assert!(report.failures.iter().any(|f| f.contains("opposite directions")));
    }

    #[test]
    fn stretch_test_reads_only_the_stretch_column() {
        let mut rod = stretch_rod(4.05, 0.2);
        set_energy(&mut rod, 1, [0.2, 0.9, 0.0]);
        set_energy(&mut rod, 3, [0.2, 0.1, 0.0]);
        let report = run(&rod, &SymmetryTolerances::default(), SymmetryKind::Stretch).unwrap();
        assert!(report.passed, "{:?}", report.failures);

        set_energy(&mut rod, 1, [0.0, 0.2, 0.0]);
        set_energy(&mut rod, 3, [0.0, 0.2, 0.0]);
        set_energy(&mut rod, 0, [0.0, 0.5, 0.0]);
        set_energy(&mut rod, 4, [0.0, 0.5, 0.0]);
        let report = run(&rod, &SymmetryTolerances::default(), SymmetryKind::Stretch).unwrap();
        assert!(report.passed, "{:?}", report.failures);
    }

    #[test]
    fn symmetric_bend_passes() {
        let report = run(&bend_rod(true), &SymmetryTolerances::default(), SymmetryKind::Bend).unwrap();
        assert!(report.passed, "{:?}", report.failures);
    }

    #[test]
    fn one_sided_bend_fails() {
        let report = run(&bend_rod(false), &SymmetryTolerances::default(), SymmetryKind::Bend).unwrap();
        assert!(!report.passed);
        assert_eq!(report.failures.len(), 2);
    }

    #[test]
    fn rods_that_cannot_be_mirrored_are_rejected() {
        let tolerances = SymmetryTolerances::default();
        assert!(run(&fixtures::straight_rod(4, 3), &tolerances, SymmetryKind::Bend).is_err());
        assert!(run(&fixtures::straight_rod(5, 2), &tolerances, SymmetryKind::Stretch).is_err());
    }
}
