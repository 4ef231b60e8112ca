//! Pre-fetches model artifacts from the Hugging Face Hub into the local hub
//! cache so the application can later load them without network access.

pub mod core;
pub mod hub;
pub mod models;
pub mod output;

pub use crate::core::{Fetcher, PrefetchSettings, RunSummary};
pub use hub::{HfHubClient, HubClient};
pub use models::{default_catalog, ModelSpec};
pub use output::Report;
