use crate::core::math::fast::FastRodMath;
use crate::core::math::rod::{ReferenceRodMath, RodMath};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Which implementation of the energy formulas the analysis runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MathBackend {
    #[default]
    Reference,
    Fast,
}

impl MathBackend {
    pub fn instantiate(self) -> Box<dyn RodMath> {
        match self {
            MathBackend::Reference => Box::new(ReferenceRodMath),
            MathBackend::Fast => Box::new(FastRodMath),
        }
    }
}

/// Relative tolerances and thresholds applied by the symmetry tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymmetryTolerances {
    /// Relative tolerance between mirrored stretch energies.
    pub stretch_energy: f64,
    /// Relative tolerance between mirrored bend energies.
    pub bend_energy: f64,
    /// Relative tolerance on the central node's x position in the stretch test.
    pub central_node: f64,
    /// Relative tolerance between mirrored side-node displacements in the bend test.
    pub side_dynamics: f64,
    /// Minimum cosine between every segment and the x axis for a rod to count as straight.
    pub straightness: f64,
    /// Maximum cosine between the two end-node displacements in the stretch test.
    pub opposite_motion: f64,
}

impl Default for SymmetryTolerances {
    fn default() -> Self {
        Self {
            stretch_energy: 0.001,
            bend_energy: 0.01,
            central_node: 0.001,
            side_dynamics: 0.01,
            straightness: 0.999,
            opposite_motion: 0.0001,
        }
    }
}

/// Parameters forwarded to the rigid aligner when RMSD needs aligned frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentConfig {
    pub max_iterations: usize,
    pub tolerance: f64,
    /// Every this many frames the alignment restarts from the raw equilibrium
    /// instead of the previous aligned frame, bounding accumulated drift.
    pub reanchor_interval: usize,
    pub progress_interval: usize,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            tolerance: 1e-9,
            reanchor_interval: 15_000,
            progress_interval: 1_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub backend: MathBackend,
    pub symmetry: SymmetryTolerances,
    pub alignment: AlignmentConfig,
    /// Temperature in kelvin for the thermodynamic predictions.
    pub temperature: Option<f64>,
}

impl AnalysisConfig {
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder::new()
    }
}

#[derive(Default)]
pub struct AnalysisConfigBuilder {
    backend: Option<MathBackend>,
    symmetry: Option<SymmetryTolerances>,
    alignment: Option<AlignmentConfig>,
    temperature: Option<f64>,
}

impl AnalysisConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn backend(mut self, backend: MathBackend) -> Self {
        self.backend = Some(backend);
        self
    }
    pub fn symmetry(mut self, tolerances: SymmetryTolerances) -> Self {
        self.symmetry = Some(tolerances);
        self
    }
    pub fn alignment(mut self, alignment: AlignmentConfig) -> Self {
        self.alignment = Some(alignment);
        self
    }
    pub fn temperature(mut self, kelvin: f64) -> Self {
        self.temperature = Some(kelvin);
        self
    }

    pub fn build(self) -> Result<AnalysisConfig, ConfigError> {
        let backend = self
            .backend
            .ok_or(ConfigError::MissingParameter("backend"))?;
        let symmetry = self.symmetry.unwrap_or_default();
        let alignment = self.alignment.unwrap_or_default();

        if let Some(t) = self.temperature {
            if !(t.is_finite() && t > 0.0) {
                return Err(ConfigError::InvalidParameter {
                    name: "temperature",
                    reason: format!("must be a positive number of kelvin, got {}", t),
                });
            }
        }
        if alignment.max_iterations == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "max_iterations",
                reason: "must be at least 1".into(),
            });
        }
        if alignment.reanchor_interval == 0 || alignment.progress_interval == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "reanchor_interval",
                reason: "intervals must be at least 1 frame".into(),
            });
        }
        if !(alignment.tolerance > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "tolerance",
                reason: format!("must be positive, got {}", alignment.tolerance),
            });
        }
        for (name, value) in [
            ("stretch_energy", symmetry.stretch_energy),
            ("bend_energy", symmetry.bend_energy),
            ("central_node", symmetry.central_node),
            ("side_dynamics", symmetry.side_dynamics),
        ] {
            if !(value >= 0.0) {
                return Err(ConfigError::InvalidParameter {
                    name,
                    reason: format!("relative tolerance must be non-negative, got {}", value),
                });
            }
        }

        Ok(AnalysisConfig {
            backend,
            symmetry,
            alignment,
            temperature: self.temperature,
        })
    }
}
