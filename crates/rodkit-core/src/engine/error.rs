use thiserror::Error;

use crate::core::math::vector::MathError;
use crate::core::models::array::ShapeError;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Math error: {0}")]
    Math(#[from] MathError),

    #[error("Precondition '{assumption}' violated: {detail}")]
    Precondition {
        assumption: &'static str,
        detail: String,
    },

    #[error("Missing collaborator '{name}': {hint}")]
    MissingCollaborator {
        name: &'static str,
        hint: &'static str,
    },

    #[error("Collaborator '{name}' failed: {message}")]
    CollaboratorFailed { name: &'static str, message: String },

    #[error("Shape error: {0}")]
    Shape(#[from] ShapeError),
}

impl AnalysisError {
    pub(crate) fn precondition(assumption: &'static str, detail: impl Into<String>) -> Self {
        Self::Precondition {
            assumption,
            detail: detail.into(),
        }
    }
}
