//! Builds the reporters for every enabled engine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;
use vigil_config::ProjectConfig;
use vigil_engine::{build_reporter, AnalysisError, IncrementalReporter, Reporter};

use crate::client::RpcReporter;
use crate::pool::PartitionedReporter;
use crate::worker::WorkerCommand;

/// Where engines run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Placement {
    /// Inside the host process.
    InProcess,
    /// In `vigil worker` processes started with this configuration file.
    Workers {
        /// Path handed to each worker's `--config`.
        config_path: PathBuf,
    },
}

/// Creates one reporter per enabled engine, in engine order.
///
/// Engines configured with more than one worker get a
/// [`PartitionedReporter`].
pub fn build_reporters(
    config: &ProjectConfig,
    root: &Path,
    placement: &Placement,
) -> Result<Vec<Arc<dyn Reporter>>, AnalysisError> {
    let mut reporters: Vec<Arc<dyn Reporter>> = Vec::new();
    for (kind, engine) in config.enabled_engines() {
        let workers = engine.workers.max(1);
        debug!(engine = %kind, workers, ?placement, "building reporter");
        let reporter: Arc<dyn Reporter> = match placement {
            Placement::InProcess if workers == 1 => Arc::new(build_reporter(config, kind, root)?),
            Placement::InProcess => {
                let pool = (0..workers)
                    .map(|_| build_reporter(config, kind, root))
                    .collect::<Result<Vec<IncrementalReporter>, _>>()?;
                Arc::new(PartitionedReporter::new(kind.name(), pool))
            }
            Placement::Workers { config_path } => {
                let command = WorkerCommand::for_engine(kind, config_path)?;
                if workers == 1 {
                    Arc::new(RpcReporter::new(kind.name(), command))
                } else {
                    let pool = (0..workers)
                        .map(|_| RpcReporter::new(kind.name(), command.clone()))
                        .collect();
                    Arc::new(PartitionedReporter::new(kind.name(), pool))
                }
            }
        };
        reporters.push(reporter);
    }
    Ok(reporters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_config::load_config_from_str;

    const CONFIG: &str = r#"
[project]
name = "demo"

[engines.check]
workers = 3

[engines.lint]
"#;

    #[test]
    fn in_process_reporters_in_engine_order() {
        let config = load_config_from_str(CONFIG).unwrap();
        let reporters = build_reporters(&config, Path::new("/p"), &Placement::InProcess).unwrap();
        let names: Vec<&str> = reporters.iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["check", "lint"]);
    }

    #[test]
    fn worker_reporters_do_not_spawn_until_connect() {
        let config = load_config_from_str(CONFIG).unwrap();
        let placement = Placement::Workers {
            config_path: PathBuf::from("/p/vigil.toml"),
        };
        let reporters = build_reporters(&config, Path::new("/p"), &placement).unwrap();
        assert_eq!(reporters.len(), 2);
    }
}
