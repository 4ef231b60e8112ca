use std::path::PathBuf;

use serde::{Deserialize, Serialize};

const ENV_HUB_CACHE: &str = "HF_HUB_CACHE";
const ENV_HOME: &str = "HF_HOME";
const ENV_TOKEN: &str = "HF_TOKEN";
const ENV_OFFLINE: &str = "HF_HUB_OFFLINE";
const ENV_DISABLE_PROGRESS: &str = "HF_HUB_DISABLE_PROGRESS_BARS";

/// Settings handed to the hub client. Values left unset keep `hf-hub`'s own
/// defaults (cache under `~/.cache/huggingface/hub`, token from the token file).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct PrefetchSettings {
    pub cache_dir: Option<PathBuf>,
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub offline: bool,
    pub progress: bool,
}

impl Default for PrefetchSettings {
    fn default() -> Self {
        Self {
            cache_dir: None,
            token: None,
            offline: false,
            progress: true,
        }
    }
}

impl PrefetchSettings {
    /// Reads the Hugging Face Hub environment conventions.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let cache_dir = non_empty(ENV_HUB_CACHE)
            .map(PathBuf::from)
            .or_else(|| non_empty(ENV_HOME).map(|home| PathBuf::from(home).join("hub")));

        Self {
            cache_dir,
            token: non_empty(ENV_TOKEN),
            offline: non_empty(ENV_OFFLINE).is_some_and(|value| is_truthy(&value)),
            progress: !non_empty(ENV_DISABLE_PROGRESS).is_some_and(|value| is_truthy(&value)),
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(vars: &[(&str, &str)]) -> PrefetchSettings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        PrefetchSettings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_keeps_client_defaults() {
        assert_eq!(settings_from(&[]), PrefetchSettings::default());
    }

    #[test]
    fn hub_cache_wins_over_hf_home() {
        let settings = settings_from(&[(ENV_HUB_CACHE, "/data/hub"), (ENV_HOME, "/data/hf")]);
        assert_eq!(settings.cache_dir, Some(PathBuf::from("/data/hub")));

        let settings = settings_from(&[(ENV_HOME, "/data/hf")]);
        assert_eq!(settings.cache_dir, Some(PathBuf::from("/data/hf/hub")));
    }

    #[test]
    fn flags_accept_common_truthy_values() {
        let settings = settings_from(&[
            (ENV_OFFLINE, "TRUE"),
            (ENV_DISABLE_PROGRESS, "1"),
            (ENV_TOKEN, "hf_abc"),
        ]);
        assert!(settings.offline);
        assert!(!settings.progress);
        assert_eq!(settings.token.as_deref(), Some("hf_abc"));

        assert!(!settings_from(&[(ENV_OFFLINE, "0")]).offline);
        assert!(settings_from(&[(ENV_TOKEN, "  ")]).token.is_none());
    }

    #[test]
    fn token_is_never_serialized() {
        let settings = settings_from(&[(ENV_TOKEN, "hf_secret")]);
        let json = serde_json::to_string(&settings).unwrap();
        assert!(!json.contains("hf_secret"));
    }
}
