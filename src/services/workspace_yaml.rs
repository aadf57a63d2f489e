use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::services::repository::Workspace;

#[derive(Error, Debug)]
pub enum WorkspaceYamlError {
    #[error("failed to read workspace {path}: {source}")]
    ReadFile { path: PathBuf, source: io::Error },
    #[error("failed to parse workspace {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("failed to serialize workspace: {0}")]
    Serialize(#[from] serde_yaml::Error),
    #[error("failed to write workspace {path}: {source}")]
    WriteFile { path: PathBuf, source: io::Error },
    #[error("duplicate {kind} id in workspace: {id}")]
    DuplicateId { kind: &'static str, id: String },
}

/// Loads a workspace file. Ids must be unique; over-allocation is left for
/// conflict detection to report.
pub fn load_workspace_from_yaml_file<P: AsRef<Path>>(
    path: P,
) -> Result<Workspace, WorkspaceYamlError> {
    let path = path.as_ref();
    let contents =
        std::fs::read_to_string(path).map_err(|source| WorkspaceYamlError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
    let workspace: Workspace =
        serde_yaml::from_str(&contents).map_err(|source| WorkspaceYamlError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    check_unique_ids(&workspace)?;
    Ok(workspace)
}

pub fn save_workspace_to_yaml_file<P: AsRef<Path>>(
    path: P,
    workspace: &Workspace,
) -> Result<(), WorkspaceYamlError> {
    let path = path.as_ref();
    let yaml = serde_yaml::to_string(workspace)?;
    std::fs::write(path, yaml).map_err(|source| WorkspaceYamlError::WriteFile {
        path: path.to_path_buf(),
        source,
    })
}

fn check_unique_ids(workspace: &Workspace) -> Result<(), WorkspaceYamlError> {
    let mut seen = std::collections::HashSet::new();
    for scenario in &workspace.scenarios {
        if !seen.insert(scenario.id.as_str()) {
            return Err(WorkspaceYamlError::DuplicateId {
                kind: "scenario",
                id: scenario.id.clone(),
            });
        }
    }
    seen.clear();
    for allocation in &workspace.scenario_allocations {
        if !seen.insert(allocation.id.as_str()) {
            return Err(WorkspaceYamlError::DuplicateId {
                kind: "scenario allocation",
                id: allocation.id.clone(),
            });
        }
    }
    Ok(())
}
