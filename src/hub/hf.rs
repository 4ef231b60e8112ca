use std::path::PathBuf;

use directories::BaseDirs;
use hf_hub::{
    api::sync::{Api, ApiBuilder, ApiRepo},
    Cache,
};
use once_cell::unsync::OnceCell;

use crate::core::settings::PrefetchSettings;

use super::{
    cache::CachedSnapshot,
    client::HubError,
    loader::HubLoader,
    source::{Snapshot, SnapshotSource},
};

/// Hub cache location relative to the home directory.
const HOME_CACHE_PATH: &[&str] = &[".cache", "huggingface", "hub"];

/// The production hub client: loaders on top of `hf-hub` snapshots.
pub type HfHubClient = HubLoader<HfSource>;

impl HubLoader<HfSource> {
    pub fn from_settings(settings: PrefetchSettings) -> Self {
        HubLoader::new(HfSource::new(settings))
    }
}

/// Opens repos through the Hugging Face Hub API, or only from the local cache
/// when offline.
pub struct HfSource {
    settings: PrefetchSettings,
    cache: Option<Cache>,
    api: OnceCell<Api>,
}

impl HfSource {
    pub fn new(settings: PrefetchSettings) -> Self {
        let home = BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf());
        Self::with_home_dir(settings, home)
    }

    fn with_home_dir(settings: PrefetchSettings, home: Option<PathBuf>) -> Self {
        let cache = resolve_cache_dir(&settings, home).map(Cache::new);
        Self {
            settings,
            cache,
            api: OnceCell::new(),
        }
    }

    fn cache(&self) -> Result<&Cache, HubError> {
        self.cache.as_ref().ok_or_else(|| {
            HubError::Client(
                "no hub cache directory: set HF_HUB_CACHE or HF_HOME, or run with a home directory"
                    .into(),
            )
        })
    }

    fn api(&self, cache: &Cache) -> Result<&Api, HubError> {
        self.api.get_or_try_init(|| {
            let mut builder =
                ApiBuilder::from_cache(cache.clone()).with_progress(self.settings.progress);
            if let Some(token) = &self.settings.token {
                builder = builder.with_token(Some(token.clone()));
            }
            builder
                .build()
                .map_err(|err| HubError::Client(err.to_string()))
        })
    }
}

impl SnapshotSource for HfSource {
    fn open(&self, repo_id: &str) -> Result<Box<dyn Snapshot>, HubError> {
        let cache = self.cache()?;
        if self.settings.offline {
            return match locate_cached(cache, repo_id)? {
                Some(snapshot) => Ok(Box::new(snapshot)),
                None => Err(HubError::NotCached {
                    repo: repo_id.to_string(),
                }),
            };
        }

        let repo = self.api(cache)?.model(repo_id.to_string());
        match repo.info() {
            Ok(info) => Ok(Box::new(OnlineSnapshot {
                repo_id: repo_id.to_string(),
                files: info
                    .siblings
                    .into_iter()
                    .map(|sibling| sibling.rfilename)
                    .collect(),
                repo,
            })),
            Err(error) => fall_back_to_cache(cache, repo_id, error.to_string()),
        }
    }
}

/// `HF_HUB_CACHE`/`HF_HOME` first, then the hub's default under the home
/// directory. `None` when neither is known.
fn resolve_cache_dir(settings: &PrefetchSettings, home: Option<PathBuf>) -> Option<PathBuf> {
    settings.cache_dir.clone().or_else(|| {
        home.map(|home| {
            HOME_CACHE_PATH
                .iter()
                .fold(home, |path, part| path.join(part))
        })
    })
}

fn locate_cached(cache: &Cache, repo_id: &str) -> Result<Option<CachedSnapshot>, HubError> {
    CachedSnapshot::locate(cache, repo_id).map_err(|err| HubError::Cache {
        repo: repo_id.to_string(),
        message: format!("{err:#}"),
    })
}

/// After a failed listing, serves the cached snapshot if there is one. The
/// request error is what gets reported otherwise, even if the cache itself
/// is unreadable.
fn fall_back_to_cache(
    cache: &Cache,
    repo_id: &str,
    request_error: String,
) -> Result<Box<dyn Snapshot>, HubError> {
    match locate_cached(cache, repo_id) {
        Ok(Some(snapshot)) => {
            tracing::warn!(
                "Listing {repo_id} on the hub failed, using cached snapshot: {request_error}"
            );
            return Ok(Box::new(snapshot));
        }
        Ok(None) => {}
        Err(cache_error) => {
            tracing::warn!("Ignoring unusable cache for {repo_id}: {cache_error}");
        }
    }
    Err(HubError::Request {
        repo: repo_id.to_string(),
        message: request_error,
    })
}

struct OnlineSnapshot {
    repo_id: String,
    files: Vec<String>,
    repo: ApiRepo,
}

impl Snapshot for OnlineSnapshot {
    fn repo_id(&self) -> &str {
        &self.repo_id
    }

    fn files(&self) -> &[String] {
        &self.files
    }

    /// Cache-first: files already in the hub cache are returned without a
    /// request.
    fn fetch(&self, file: &str) -> Result<PathBuf, HubError> {
        self.repo.get(file).map_err(|err| HubError::Download {
            repo: self.repo_id.clone(),
            file: file.to_string(),
            message: err.to_string(),
        })
    }
}
