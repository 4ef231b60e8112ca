mod cache;
mod client;
mod hf;
mod loader;
mod source;

pub use cache::CachedSnapshot;
pub use client::{CachedArtifact, HubClient, HubError};
pub use hf::{HfHubClient, HfSource};
pub use loader::HubLoader;
pub use source::{Snapshot, SnapshotSource};
