use std::io::Write;

use thiserror::Error;

use crate::hub::{CachedArtifact, HubClient, HubError};
use crate::models::ModelSpec;
use crate::output::Report;

/// A model that could not be fetched, with the underlying cause flattened
/// into a message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to download {model_id}: {message}")]
pub struct FetchError {
    pub model_id: String,
    pub message: String,
}

impl FetchError {
    fn new(model_id: &str, source: HubError) -> Self {
        Self {
            model_id: model_id.to_string(),
            message: source.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchedModel {
    pub model_id: String,
    pub weights: CachedArtifact,
    pub processor: Option<CachedArtifact>,
}

#[derive(Debug)]
pub struct FetchOutcome {
    pub model_id: String,
    pub result: Result<FetchedModel, FetchError>,
}

/// Outcomes of a run, in the order the models were attempted.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<FetchOutcome>,
}

impl RunSummary {
    pub fn cached(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.result.is_ok())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.cached()
    }

    pub fn failures(&self) -> impl Iterator<Item = &FetchError> {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().err())
    }
}

pub struct Fetcher<C> {
    client: C,
}

impl<C: HubClient> Fetcher<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Caches the weights and, unless disabled, the processor of one model.
    pub fn fetch(&self, spec: &ModelSpec) -> Result<FetchedModel, FetchError> {
        let options = spec.load_options();
        tracing::debug!(
            "Resolved loaders for {}: weights={}, processor={}",
            spec.id,
            spec.model_class,
            spec.processor_class
                .map_or_else(|| "none".to_string(), |class| class.to_string())
        );

        let weights = self
            .client
            .load_weights(&spec.id, spec.model_class, &options)
            .map_err(|err| FetchError::new(&spec.id, err))?;

        let processor = match spec.processor_class {
            Some(class) => Some(
                self.client
                    .load_processor(&spec.id, class, &options)
                    .map_err(|err| FetchError::new(&spec.id, err))?,
            ),
            None => None,
        };

        Ok(FetchedModel {
            model_id: spec.id.clone(),
            weights,
            processor,
        })
    }

    /// Attempts every spec in order. A failure is reported and the run moves
    /// on; nothing here aborts early.
    pub fn run<W: Write>(&self, specs: &[ModelSpec], report: &mut Report<W>) -> RunSummary {
        report.started();
        let mut summary = RunSummary::default();

        for spec in specs {
            tracing::info!("Fetching {}", spec.id);
            let result = self.fetch(spec);
            match &result {
                Ok(fetched) => {
                    tracing::debug!(
                        "{} cached {} weight files",
                        fetched.model_id,
                        fetched.weights.files.len()
                    );
                    report.cached(&spec.id);
                }
                Err(error) => {
                    tracing::warn!("{error}");
                    report.failed(error);
                }
            }
            summary.outcomes.push(FetchOutcome {
                model_id: spec.id.clone(),
                result,
            });
        }

        report.completed(&summary);
        summary
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::models::{LoadOptions, ModelClass, ProcessorClass};

    #[derive(Default)]
    struct ScriptedClient {
        failing_weights: Vec<&'static str>,
        failing_processors: Vec<&'static str>,
        calls: RefCell<Vec<String>>,
    }

    impl HubClient for ScriptedClient {
        fn load_weights(
            &self,
            repo_id: &str,
            class: ModelClass,
            options: &LoadOptions,
        ) -> Result<CachedArtifact, HubError> {
            self.calls.borrow_mut().push(format!(
                "weights:{repo_id}:{class}:{}",
                options.trusts_remote_code()
            ));
            if self.failing_weights.iter().any(|id| *id == repo_id) {
                return Err(HubError::Request {
                    repo: repo_id.to_string(),
                    message: "connection refused".into(),
                });
            }
            Ok(CachedArtifact {
                repo_id: repo_id.to_string(),
                files: vec![],
            })
        }

        fn load_processor(
            &self,
            repo_id: &str,
            class: ProcessorClass,
            _options: &LoadOptions,
        ) -> Result<CachedArtifact, HubError> {
            self.calls
                .borrow_mut()
                .push(format!("processor:{repo_id}:{class}"));
            if self.failing_processors.iter().any(|id| *id == repo_id) {
                return Err(HubError::NoProcessorFiles {
                    repo: repo_id.to_string(),
                    loader: class,
                });
            }
            Ok(CachedArtifact {
                repo_id: repo_id.to_string(),
                files: vec![],
            })
        }
    }

    #[test]
    fn fetch_forwards_selectors_and_trust_flag() {
        let fetcher = Fetcher::new(ScriptedClient::default());
        let spec = ModelSpec::new("org/custom")
            .with_model_class(ModelClass::CausalLm)
            .with_processor_class(ProcessorClass::Tokenizer)
            .trust_remote_code(true);
        let fetched = fetcher.fetch(&spec).unwrap();
        assert!(fetched.processor.is_some());
        assert_eq!(
            *fetcher.client().calls.borrow(),
            [
                "weights:org/custom:AutoModelForCausalLM:true",
                "processor:org/custom:AutoTokenizer",
            ]
        );
    }

    #[test]
    fn disabled_processor_is_never_invoked() {
        let fetcher = Fetcher::new(ScriptedClient::default());
        let fetched = fetcher
            .fetch(&ModelSpec::new("org/weights").without_processor())
            .unwrap();
        assert!(fetched.processor.is_none());
        assert_eq!(
            *fetcher.client().calls.borrow(),
            ["weights:org/weights:AutoModel:false"]
        );
    }

    #[test]
    fn weight_failure_skips_processor_for_that_spec() {
        let fetcher = Fetcher::new(ScriptedClient {
            failing_weights: vec!["org/down"],
            ..ScriptedClient::default()
        });
        let err = fetcher.fetch(&ModelSpec::new("org/down")).unwrap_err();
        assert_eq!(err.model_id, "org/down");
        assert!(err.message.contains("connection refused"));
        assert_eq!(fetcher.client().calls.borrow().len(), 1);
    }

    #[test]
    fn processor_failure_fails_the_spec() {
        let fetcher = Fetcher::new(ScriptedClient {
            failing_processors: vec!["org/weights-only"],
            ..ScriptedClient::default()
        });
        let err = fetcher
            .fetch(&ModelSpec::new("org/weights-only"))
            .unwrap_err();
        assert!(err.message.contains("no AutoProcessor files"));
    }

    #[test]
    fn run_continues_past_failures_and_counts_them() {
        let fetcher = Fetcher::new(ScriptedClient {
            failing_weights: vec!["org/a"],
            ..ScriptedClient::default()
        });
        let specs = [ModelSpec::new("org/a"), ModelSpec::new("org/b")];
        let mut report = Report::new(Vec::new());
        let summary = fetcher.run(&specs, &mut report);

        assert_eq!(summary.cached(), 1);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.failures().next().unwrap().model_id, "org/a");
        let ids: Vec<_> = summary
            .outcomes
            .iter()
            .map(|outcome| outcome.model_id.as_str())
            .collect();
        assert_eq!(ids, ["org/a", "org/b"]);
    }
}
