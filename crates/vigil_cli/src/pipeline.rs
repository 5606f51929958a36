//! Shared setup for CLI commands.
//!
//! Contains project root resolution, configuration loading and the
//! construction of an [`Orchestrator`] over the enabled engines.

use std::path::{Path, PathBuf};

use vigil_common::FileId;
use vigil_config::{FileSelection, ProjectConfig, CONFIG_FILE_NAME};
use vigil_orchestrator::{build_reporters, IssueFilter, Orchestrator, Placement};

use crate::GlobalArgs;

/// A loaded project.
pub struct Project {
    /// Directory containing the configuration file.
    pub root: PathBuf,
    /// The configuration file itself.
    pub config_path: PathBuf,
    /// The parsed configuration.
    pub config: ProjectConfig,
}

/// Walks up from `start` looking for the nearest directory containing `vigil.toml`.
///
/// Returns the directory containing `vigil.toml`, or an error if none is found.
pub fn find_project_root(start: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE_NAME).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(format!(
                "could not find {CONFIG_FILE_NAME} in {} or any parent directory",
                start.display()
            )
            .into());
        }
    }
}

/// Resolves the configuration file from global CLI args.
///
/// If `--config` is specified, uses that path (file → itself, dir → its
/// `vigil.toml`). Otherwise walks up from the current directory.
pub fn resolve_config_path(global: &GlobalArgs) -> Result<PathBuf, Box<dyn std::error::Error>> {
    match global.config {
        Some(ref path) if path.is_dir() => Ok(path.join(CONFIG_FILE_NAME)),
        Some(ref path) => Ok(path.clone()),
        None => Ok(find_project_root(&std::env::current_dir()?)?.join(CONFIG_FILE_NAME)),
    }
}

/// Loads the configuration file at `config_path`.
///
/// The project root is the file's directory, made absolute so worker
/// processes agree with the host on it.
pub fn load_project(config_path: &Path) -> Result<Project, Box<dyn std::error::Error>> {
    let config_path = std::path::absolute(config_path)?;
    let root = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let config = vigil_config::load_config_file(&config_path)?;
    Ok(Project {
        root,
        config_path,
        config,
    })
}

impl Project {
    /// Where engines run for this invocation.
    pub fn placement(&self, in_process: bool) -> Placement {
        if in_process {
            Placement::InProcess
        } else {
            Placement::Workers {
                config_path: self.config_path.clone(),
            }
        }
    }

    /// Builds an orchestrator over every enabled engine.
    pub fn orchestrator(&self, in_process: bool) -> Result<Orchestrator, Box<dyn std::error::Error>> {
        let reporters = build_reporters(&self.config, &self.root, &self.placement(in_process))?;
        Ok(Orchestrator::new(reporters).with_filter(IssueFilter::from_config(&self.config.issues)))
    }

    /// Lists every file some enabled engine analyzes, sorted.
    pub fn watched_files(&self) -> Result<Vec<FileId>, Box<dyn std::error::Error>> {
        let mut files = Vec::new();
        for (kind, _) in self.config.enabled_engines() {
            files.extend(FileSelection::for_engine(&self.config, kind, &self.root).discover()?);
        }
        files.sort();
        files.dedup();
        Ok(files)
    }
}
