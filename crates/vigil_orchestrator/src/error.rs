//! Error types for analysis cycles.

use vigil_engine::AnalysisError;

/// A cycle that failed because one engine failed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{engine} engine failed: {source}")]
pub struct CycleError {
    /// Name of the engine whose report failed.
    pub engine: String,
    /// What went wrong.
    pub source: AnalysisError,
}

impl CycleError {
    /// Creates a cycle error for `engine`.
    pub fn new(engine: impl Into<String>, source: AnalysisError) -> Self {
        Self {
            engine: engine.into(),
            source,
        }
    }
}
