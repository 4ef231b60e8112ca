use std::path::PathBuf;

use super::client::HubError;

/// One revision of a repo: the files it contains and a way to cache them.
pub trait Snapshot {
    fn repo_id(&self) -> &str;

    /// Repo-relative file names, `/`-separated.
    fn files(&self) -> &[String];

    /// Returns the cached path of `file`, downloading it first if needed.
    fn fetch(&self, file: &str) -> Result<PathBuf, HubError>;

    fn contains(&self, file: &str) -> bool {
        self.files().iter().any(|name| name == file)
    }
}

/// Opens snapshots by repo id.
pub trait SnapshotSource {
    fn open(&self, repo_id: &str) -> Result<Box<dyn Snapshot>, HubError>;
}
