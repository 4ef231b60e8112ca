use std::path::PathBuf;

use thiserror::Error;

use crate::models::{LoadOptions, ModelClass, ProcessorClass};

/// Errors raised while resolving or caching a repo's files.
#[derive(Debug, Error)]
pub enum HubError {
    #[error("hub client unavailable: {0}")]
    Client(String),

    #[error("request for {repo} failed: {message}")]
    Request { repo: String, message: String },

    #[error("download of {file} from {repo} failed: {message}")]
    Download {
        repo: String,
        file: String,
        message: String,
    },

    #[error("cached snapshot of {repo} is unreadable: {message}")]
    Cache { repo: String, message: String },

    #[error("{repo} is not in the local cache and the hub is offline")]
    NotCached { repo: String },

    #[error("{file} is not available in {repo}")]
    MissingFile { repo: String, file: String },

    #[error("no supported weight files in {repo}")]
    NoWeights { repo: String },

    #[error("no {loader} files in {repo}")]
    NoProcessorFiles { repo: String, loader: ProcessorClass },

    #[error("invalid {file} in {repo}: {message}")]
    InvalidConfig {
        repo: String,
        file: String,
        message: String,
    },

    #[error("{repo} ships its own code for {class} and its model_type is not a known built-in; loading it requires trust_remote_code")]
    RemoteCodeRequired { repo: String, class: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Local handle to whatever a loader call placed in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedArtifact {
    pub repo_id: String,
    pub files: Vec<PathBuf>,
}

/// The two loader operations the fetcher needs from a model hub.
///
/// Both calls download missing files into the hub cache as a side effect and
/// succeed without network traffic when everything is already cached.
pub trait HubClient {
    fn load_weights(
        &self,
        repo_id: &str,
        class: ModelClass,
        options: &LoadOptions,
    ) -> Result<CachedArtifact, HubError>;

    fn load_processor(
        &self,
        repo_id: &str,
        class: ProcessorClass,
        options: &LoadOptions,
    ) -> Result<CachedArtifact, HubError>;
}

impl<C: HubClient + ?Sized> HubClient for &C {
    fn load_weights(
        &self,
        repo_id: &str,
        class: ModelClass,
        options: &LoadOptions,
    ) -> Result<CachedArtifact, HubError> {
        (**self).load_weights(repo_id, class, options)
    }

    fn load_processor(
        &self,
        repo_id: &str,
        class: ProcessorClass,
        options: &LoadOptions,
    ) -> Result<CachedArtifact, HubError> {
        (**self).load_processor(repo_id, class, options)
    }
}
