pub mod fetcher;
pub mod settings;

pub use fetcher::{FetchError, FetchOutcome, FetchedModel, Fetcher, RunSummary};
pub use settings::PrefetchSettings;
