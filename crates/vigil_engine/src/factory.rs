//! Builds engines and in-process reporters from configuration.

use std::path::Path;
use std::sync::Arc;

use vigil_config::{EngineConfig, EngineKind, FileSelection, ProjectConfig};

use crate::check::CheckEngine;
use crate::engine::AnalysisEngine;
use crate::error::AnalysisError;
use crate::incremental::IncrementalReporter;
use crate::lint::LintEngine;

/// Instantiates the built-in engine of the given kind.
pub fn build_engine(kind: EngineKind, config: &EngineConfig) -> Arc<dyn AnalysisEngine> {
    match kind {
        EngineKind::Check => Arc::new(CheckEngine::new()),
        EngineKind::Lint => Arc::new(LintEngine::new(config)),
    }
}

/// Builds an incremental reporter for one configured engine.
///
/// Fails with [`AnalysisError::Configuration`] when the engine is not
/// configured or is disabled.
pub fn build_reporter(
    config: &ProjectConfig,
    kind: EngineKind,
    root: &Path,
) -> Result<IncrementalReporter, AnalysisError> {
    let engine_config = config
        .engines
        .get(kind)
        .filter(|engine| engine.enabled)
        .ok_or_else(|| AnalysisError::Configuration(format!("engine '{kind}' is not enabled")))?;
    let selection = FileSelection::for_engine(config, kind, root);
    Ok(IncrementalReporter::new(
        build_engine(kind, engine_config),
        selection,
    ))
}
