//! JSON run manifests written beside command outputs.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Failure,
}

/// Diagnostic counts at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCounts {
    pub warnings: usize,
    pub errors: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub run_id: String,
    pub command: String,
    pub version: String,
    pub finished_at: String,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u128>,
    pub output: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    #[serde(default)]
    pub issues: IssueCounts,
}

impl ManifestEntry {
    pub fn new(command: &str, output: &Path, status: RunStatus) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            command: command.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            finished_at: Utc::now().to_rfc3339(),
            status,
            duration_ms: None,
            output: output.display().to_string(),
            params: BTreeMap::new(),
            issues: IssueCounts::default(),
        }
    }

    pub fn with_params(mut self, params: &[(&str, &str)]) -> Self {
        self.params.extend(
            params
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string())),
        );
        self
    }

    /// Write `run-<id>.json` into `output` when it is a directory, otherwise
    /// into its parent.
    pub fn write_beside(&self, output: &Path) -> Result<PathBuf> {
        let dir = if output.is_dir() {
            output.to_path_buf()
        } else {
            match output.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            }
        };
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating manifest directory '{}'", dir.display()))?;
        let path = dir.join(format!("run-{}.json", self.run_id));
        fs::write(&path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }
}

pub fn read_manifest(path: &Path) -> Result<ManifestEntry> {
    let json =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing manifest {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn manifest_lands_beside_a_file_output() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("errors.csv");
        let mut entry =
            ManifestEntry::new("evaluate", &output, RunStatus::Success).with_params(&[("phase", "1")]);
        entry.duration_ms = Some(12);
        entry.issues.warnings = 2;
        let path = entry.write_beside(&output).unwrap();
        assert_eq!(path.parent().unwrap(), dir.path());

        let back = read_manifest(&path).unwrap();
        assert_eq!(back.command, "evaluate");
        assert_eq!(back.status, RunStatus::Success);
        assert_eq!(back.params["phase"], "1");
        assert_eq!(back.issues, IssueCounts { warnings: 2, errors: 0 });
    }

    #[test]
    fn manifest_lands_inside_a_directory_output() {
        let dir = tempdir().unwrap();
        let entry = ManifestEntry::new("prepare", dir.path(), RunStatus::Failure);
        let path = entry.write_beside(dir.path()).unwrap();
        assert_eq!(path.parent().unwrap(), dir.path());
        assert!(fs::read_to_string(path).unwrap().contains("\"failure\""));
    }
}
