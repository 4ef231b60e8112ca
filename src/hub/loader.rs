use std::{
    collections::{BTreeSet, HashSet},
    fs,
    path::{Path, PathBuf},
};

use serde_json::Value;

use crate::models::{LoadOptions, ModelClass, ProcessorClass};

use super::{
    client::{CachedArtifact, HubClient, HubError},
    source::{Snapshot, SnapshotSource},
};

const CONFIG_FILE: &str = "config.json";
const GENERATION_CONFIG_FILE: &str = "generation_config.json";
const PREPROCESSOR_CONFIG_FILE: &str = "preprocessor_config.json";
const PROCESSOR_CONFIG_FILE: &str = "processor_config.json";
const TOKENIZER_CONFIG_FILE: &str = "tokenizer_config.json";
const CHAT_TEMPLATE_FILE: &str = "chat_template.json";
const AUTO_CONFIG_CLASS: &str = "AutoConfig";

const TOKENIZER_FILES: &[&str] = &[
    TOKENIZER_CONFIG_FILE,
    "tokenizer.json",
    "vocab.json",
    "vocab.txt",
    "merges.txt",
    "special_tokens_map.json",
    "added_tokens.json",
    "tokenizer.model",
    "spiece.model",
    "sentencepiece.bpe.model",
];

/// `model_type`s the runtime ships its own classes for. Hub code listed in the
/// `auto_map` of these repos is optional and only fetched when trusted.
const NATIVE_MODEL_TYPES: &[&str] = &[
    "bart",
    "bert",
    "clip",
    "falcon",
    "gemma",
    "gpt2",
    "gpt_neox",
    "llama",
    "mistral",
    "mixtral",
    "mpt",
    "phi",
    "phi3",
    "qwen2",
    "roberta",
    "stablelm",
    "starcoder2",
    "t5",
    "vit",
    "whisper",
];

/// Config files whose `auto_map` may point processor loaders at hub-hosted code.
const PROCESSOR_SIDE_CONFIGS: &[&str] = &[
    PROCESSOR_CONFIG_FILE,
    PREPROCESSOR_CONFIG_FILE,
    TOKENIZER_CONFIG_FILE,
];

#[derive(Debug, Clone, Copy)]
enum WeightLayout {
    Single(&'static str),
    Sharded(&'static str),
}

/// Checked in order; the first layout present in the repo wins.
const WEIGHT_LAYOUTS: &[WeightLayout] = &[
    WeightLayout::Single("model.safetensors"),
    WeightLayout::Sharded("model.safetensors.index.json"),
    WeightLayout::Single("pytorch_model.bin"),
    WeightLayout::Sharded("pytorch_model.bin.index.json"),
];

/// Resolves loader selectors into repo files and caches them through a
/// [`SnapshotSource`].
pub struct HubLoader<S> {
    source: S,
}

impl<S: SnapshotSource> HubLoader<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn resolve_remote_code(
        &self,
        snapshot: &dyn Snapshot,
        config: &Value,
        classes: &[&str],
        native: bool,
        options: &LoadOptions,
        cached: &mut Vec<PathBuf>,
    ) -> Result<(), HubError> {
        let references = auto_map_references(config, classes);
        let Some((class, _)) = references.first() else {
            return Ok(());
        };
        if !options.trusts_remote_code() {
            if native {
                tracing::debug!(
                    "{} lists hub code for {class}; using the built-in classes",
                    snapshot.repo_id()
                );
                return Ok(());
            }
            return Err(HubError::RemoteCodeRequired {
                repo: snapshot.repo_id().to_string(),
                class: class.clone(),
            });
        }

        let mut seen = HashSet::new();
        for (_, reference) in &references {
            let module = ModuleRef::parse(reference, snapshot.repo_id());
            self.fetch_code(snapshot, module, &mut seen, cached)?;
        }
        Ok(())
    }

    fn fetch_code(
        &self,
        snapshot: &dyn Snapshot,
        module: ModuleRef,
        seen: &mut HashSet<(String, String)>,
        cached: &mut Vec<PathBuf>,
    ) -> Result<(), HubError> {
        let external;
        let target: &dyn Snapshot = if module.repo == snapshot.repo_id() {
            snapshot
        } else {
            external = self.source.open(&module.repo)?;
            external.as_ref()
        };

        let mut pending = vec![module.file];
        while let Some(file) = pending.pop() {
            if !seen.insert((target.repo_id().to_string(), file.clone())) {
                continue;
            }
            let path = fetch_required(target, &file)?;
            let code = fs::read_to_string(&path)?;
            pending.extend(
                relative_imports(&code)
                    .into_iter()
                    .map(|import| sibling_module_file(&file, &import)),
            );
            cached.push(path);
        }
        Ok(())
    }
}

impl<S: SnapshotSource> HubClient for HubLoader<S> {
    fn load_weights(
        &self,
        repo_id: &str,
        class: ModelClass,
        options: &LoadOptions,
    ) -> Result<CachedArtifact, HubError> {
        let snapshot = self.source.open(repo_id)?;
        let snapshot = snapshot.as_ref();
        let mut cached = Vec::new();

        let (config_path, config) = read_json(snapshot, CONFIG_FILE)?;
        cached.push(config_path);
        self.resolve_remote_code(
            snapshot,
            &config,
            &[AUTO_CONFIG_CLASS, class.auto_class()],
            is_native(&config),
            options,
            &mut cached,
        )?;

        fetch_weights(snapshot, &mut cached)?;

        if class.is_generative() && snapshot.contains(GENERATION_CONFIG_FILE) {
            cached.push(fetch_present(snapshot, GENERATION_CONFIG_FILE)?);
        }

        Ok(CachedArtifact {
            repo_id: repo_id.to_string(),
            files: cached,
        })
    }

    fn load_processor(
        &self,
        repo_id: &str,
        class: ProcessorClass,
        options: &LoadOptions,
    ) -> Result<CachedArtifact, HubError> {
        let snapshot = self.source.open(repo_id)?;
        let snapshot = snapshot.as_ref();

        if let Some(required) = required_processor_file(class) {
            if !snapshot.contains(required) {
                return Err(HubError::MissingFile {
                    repo: repo_id.to_string(),
                    file: required.to_string(),
                });
            }
        }

        let present: Vec<&str> = processor_files(class)
            .into_iter()
            .filter(|file| snapshot.contains(file))
            .collect();
        if present.is_empty() {
            return Err(HubError::NoProcessorFiles {
                repo: repo_id.to_string(),
                loader: class,
            });
        }

        let mut cached = Vec::new();
        let mut configs = Vec::new();
        let mut native = false;
        for file in present {
            if PROCESSOR_SIDE_CONFIGS.contains(&file) {
                let (path, config) = read_json(snapshot, file)?;
                cached.push(path);
                configs.push(config);
            } else {
                cached.push(fetch_present(snapshot, file)?);
            }
        }
        if snapshot.contains(CONFIG_FILE) {
            let (path, config) = read_json(snapshot, CONFIG_FILE)?;
            cached.push(path);
            native = is_native(&config);
            configs.push(config);
        }

        for config in &configs {
            self.resolve_remote_code(
                snapshot,
                config,
                &[class.auto_class()],
                native,
                options,
                &mut cached,
            )?;
        }

        Ok(CachedArtifact {
            repo_id: repo_id.to_string(),
            files: cached,
        })
    }
}

fn required_processor_file(class: ProcessorClass) -> Option<&'static str> {
    match class {
        ProcessorClass::ImageProcessor | ProcessorClass::FeatureExtractor => {
            Some(PREPROCESSOR_CONFIG_FILE)
        }
        ProcessorClass::Auto | ProcessorClass::Tokenizer => None,
    }
}

fn processor_files(class: ProcessorClass) -> Vec<&'static str> {
    match class {
        ProcessorClass::Tokenizer => TOKENIZER_FILES.to_vec(),
        ProcessorClass::ImageProcessor | ProcessorClass::FeatureExtractor => {
            vec![PREPROCESSOR_CONFIG_FILE]
        }
        ProcessorClass::Auto => [
            PROCESSOR_CONFIG_FILE,
            PREPROCESSOR_CONFIG_FILE,
            CHAT_TEMPLATE_FILE,
        ]
        .into_iter()
        .chain(TOKENIZER_FILES.iter().copied())
        .collect(),
    }
}

fn fetch_weights(snapshot: &dyn Snapshot, cached: &mut Vec<PathBuf>) -> Result<(), HubError> {
    for layout in WEIGHT_LAYOUTS {
        match *layout {
            WeightLayout::Single(file) if snapshot.contains(file) => {
                cached.push(fetch_present(snapshot, file)?);
                return Ok(());
            }
            WeightLayout::Sharded(index) if snapshot.contains(index) => {
                let (index_path, index_json) = read_json(snapshot, index)?;
                let shards = shard_files(&index_json).ok_or_else(|| HubError::InvalidConfig {
                    repo: snapshot.repo_id().to_string(),
                    file: index.to_string(),
                    message: "missing weight_map".into(),
                })?;
                cached.push(index_path);
                for shard in shards {
                    cached.push(fetch_required(snapshot, &shard)?);
                }
                return Ok(());
            }
            _ => {}
        }
    }
    Err(HubError::NoWeights {
        repo: snapshot.repo_id().to_string(),
    })
}

fn shard_files(index: &Value) -> Option<BTreeSet<String>> {
    let weight_map = index.get("weight_map")?.as_object()?;
    Some(
        weight_map
            .values()
            .filter_map(|value| value.as_str().map(str::to_string))
            .collect(),
    )
}

fn fetch_present(snapshot: &dyn Snapshot, file: &str) -> Result<PathBuf, HubError> {
    let path = snapshot.fetch(file)?;
    tracing::debug!("Cached {} from {}", file, snapshot.repo_id());
    Ok(path)
}

fn fetch_required(snapshot: &dyn Snapshot, file: &str) -> Result<PathBuf, HubError> {
    if !snapshot.contains(file) {
        return Err(HubError::MissingFile {
            repo: snapshot.repo_id().to_string(),
            file: file.to_string(),
        });
    }
    fetch_present(snapshot, file)
}

fn read_json(snapshot: &dyn Snapshot, file: &str) -> Result<(PathBuf, Value), HubError> {
    let path = fetch_required(snapshot, file)?;
    let bytes = fs::read(&path)?;
    let value = serde_json::from_slice(&bytes).map_err(|err| HubError::InvalidConfig {
        repo: snapshot.repo_id().to_string(),
        file: file.to_string(),
        message: err.to_string(),
    })?;
    Ok((path, value))
}

fn is_native(config: &Value) -> bool {
    config
        .get("model_type")
        .and_then(Value::as_str)
        .is_some_and(|model_type| NATIVE_MODEL_TYPES.contains(&model_type))
}

/// `(class, "module.Class")` pairs from a config's `auto_map` for the given
/// auto-classes. Tokenizer entries may be `[slow, fast]` arrays with nulls.
fn auto_map_references(config: &Value, classes: &[&str]) -> Vec<(String, String)> {
    let Some(auto_map) = config.get("auto_map").and_then(Value::as_object) else {
        return Vec::new();
    };
    let mut references = Vec::new();
    for class in classes {
        match auto_map.get(*class) {
            Some(Value::String(reference)) => {
                references.push((class.to_string(), reference.clone()));
            }
            Some(Value::Array(entries)) => references.extend(
                entries
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|reference| (class.to_string(), reference.to_string())),
            ),
            _ => {}
        }
    }
    references
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ModuleRef {
    repo: String,
    file: String,
}

impl ModuleRef {
    /// Parses `module.Class` or `org/repo--module.Class`.
    fn parse(reference: &str, default_repo: &str) -> Self {
        let (repo, path) = match reference.split_once("--") {
            Some((repo, path)) => (repo.to_string(), path),
            None => (default_repo.to_string(), reference),
        };
        let module = path.rsplit_once('.').map_or(path, |(module, _)| module);
        Self {
            repo,
            file: format!("{}.py", module.replace('.', "/")),
        }
    }
}

/// Modules pulled in with `from .module import ...` or `import .module`.
fn relative_imports(code: &str) -> Vec<String> {
    code.lines()
        .filter_map(|line| {
            let line = line.trim_start();
            line.strip_prefix("from .")
                .and_then(|rest| rest.split(char::is_whitespace).next())
                .or_else(|| {
                    line.strip_prefix("import")
                        .filter(|rest| rest.starts_with(char::is_whitespace))
                        .and_then(|rest| rest.trim().strip_prefix('.'))
                        .filter(|module| !module.contains(char::is_whitespace))
                })
        })
        .filter(|module| !module.is_empty() && !module.starts_with('.'))
        .map(str::to_string)
        .collect()
}

fn sibling_module_file(importer: &str, module: &str) -> String {
    let relative = format!("{}.py", module.replace('.', "/"));
    match Path::new(importer).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            format!("{}/{}", dir.to_string_lossy(), relative)
        }
        _ => relative,
    }
}
