use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use hf_hub::{Cache, Repo};

use super::{client::HubError, source::Snapshot};

const DEFAULT_REVISION: &str = "main";

/// A snapshot served entirely from the hub cache directory
/// (`models--org--name/refs/main` → `snapshots/<commit>/`).
#[derive(Debug, Clone)]
pub struct CachedSnapshot {
    repo_id: String,
    root: PathBuf,
    files: Vec<String>,
}

impl CachedSnapshot {
    /// Returns `None` when the repo has never been cached.
    pub fn locate(cache: &Cache, repo_id: &str) -> Result<Option<Self>> {
        let repo_dir = cache
            .path()
            .join(Repo::model(repo_id.to_string()).folder_name());
        let ref_path = repo_dir.join("refs").join(DEFAULT_REVISION);
        if !ref_path.exists() {
            return Ok(None);
        }

        let commit = fs::read_to_string(&ref_path)
            .with_context(|| format!("read cache ref {}", ref_path.display()))?;
        let root = repo_dir.join("snapshots").join(commit.trim());
        if !root.is_dir() {
            return Ok(None);
        }

        let mut files = Vec::new();
        collect_files(&root, &root, &mut files)
            .with_context(|| format!("list cached snapshot {}", root.display()))?;
        files.sort();

        Ok(Some(Self {
            repo_id: repo_id.to_string(),
            root,
            files,
        }))
    }
}

impl Snapshot for CachedSnapshot {
    fn repo_id(&self) -> &str {
        &self.repo_id
    }

    fn files(&self) -> &[String] {
        &self.files
    }

    fn fetch(&self, file: &str) -> Result<PathBuf, HubError> {
        let path = self.root.join(file);
        if self.contains(file) && path.exists() {
            Ok(path)
        } else {
            Err(HubError::MissingFile {
                repo: self.repo_id.clone(),
                file: file.to_string(),
            })
        }
    }
}

fn collect_files(base: &Path, dir: &Path, files: &mut Vec<String>) -> Result<()> {
    for entry in fs::read_dir(dir).context("read snapshot directory")? {
        let path = entry.context("read snapshot entry")?.path();
        if path.is_dir() {
            collect_files(base, &path, files)?;
        } else if path.exists() {
            if let Ok(relative) = path.strip_prefix(base) {
                let name: Vec<_> = relative
                    .components()
                    .map(|component| component.as_os_str().to_string_lossy().into_owned())
                    .collect();
                files.push(name.join("/"));
            }
        }
    }
    Ok(())
}
