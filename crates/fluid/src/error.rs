use fluidconfig::ConfigError;
use sources::SourceError;

use crate::types::Capability;

#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("graphics context lacks required capability: {0}")]
    MissingCapability(Capability),
    #[error("failed to compile shader program '{label}': {message}")]
    CompileFailure { label: String, message: String },
    #[error("failed to allocate GPU resource: {0}")]
    ResourceAllocation(String),
    #[error("{label} expects {expected} texels, got {actual}")]
    SizeMismatch {
        label: String,
        expected: usize,
        actual: usize,
    },
    #[error("no suitable GPU adapter: {0}")]
    NoAdapter(String),
    #[error("simulation has not been initialized")]
    NotInitialized,
    #[error("graphics context was lost")]
    ContextLost,
    #[error("source request rejected: {0}")]
    SourceRejected(#[from] SourceError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SimulationError {
    /// Errors that leave the simulation unusable until it is rebuilt.
    pub fn is_initialization_failure(&self) -> bool {
        matches!(
            self,
            SimulationError::MissingCapability(_)
                | SimulationError::CompileFailure { .. }
                | SimulationError::ResourceAllocation(_)
                | SimulationError::NoAdapter(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_initialization_failures() {
        assert!(SimulationError::MissingCapability(Capability::FloatTextures)
            .is_initialization_failure());
        assert!(SimulationError::CompileFailure {
            label: "advect".into(),
            message: "bad".into(),
        }
        .is_initialization_failure());
        assert!(!SimulationError::SourceRejected(SourceError::Empty).is_initialization_failure());
        assert!(!SimulationError::ContextLost.is_initialization_failure());
    }

    #[test]
    fn formats_missing_capability() {
        let err = SimulationError::MissingCapability(Capability::HalfFloatTextures);
        assert_eq!(
            err.to_string(),
            "graphics context lacks required capability: half-float textures"
        );
    }
}
