use std::fmt;

use serde::{Deserialize, Serialize};

/// Selects which loader materializes a model's weights.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ModelClass {
    Auto,
    CausalLm,
    MaskedLm,
    Seq2SeqLm,
    SequenceClassification,
    TokenClassification,
    QuestionAnswering,
    ImageClassification,
    Vision2Seq,
    SpeechSeq2Seq,
}

impl Default for ModelClass {
    fn default() -> Self {
        ModelClass::Auto
    }
}

impl ModelClass {
    /// Name of the hub auto-class, as it appears in a repo's `auto_map`.
    #[must_use]
    pub fn auto_class(&self) -> &'static str {
        match self {
            ModelClass::Auto => "AutoModel",
            ModelClass::CausalLm => "AutoModelForCausalLM",
            ModelClass::MaskedLm => "AutoModelForMaskedLM",
            ModelClass::Seq2SeqLm => "AutoModelForSeq2SeqLM",
            ModelClass::SequenceClassification => "AutoModelForSequenceClassification",
            ModelClass::TokenClassification => "AutoModelForTokenClassification",
            ModelClass::QuestionAnswering => "AutoModelForQuestionAnswering",
            ModelClass::ImageClassification => "AutoModelForImageClassification",
            ModelClass::Vision2Seq => "AutoModelForVision2Seq",
            ModelClass::SpeechSeq2Seq => "AutoModelForSpeechSeq2Seq",
        }
    }

    /// Generative heads ship a `generation_config.json` next to the weights.
    #[must_use]
    pub fn is_generative(&self) -> bool {
        matches!(
            self,
            ModelClass::CausalLm
                | ModelClass::Seq2SeqLm
                | ModelClass::Vision2Seq
                | ModelClass::SpeechSeq2Seq
        )
    }
}

impl fmt::Display for ModelClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.auto_class())
    }
}

/// Selects which loader materializes the companion processor artifact.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessorClass {
    Auto,
    Tokenizer,
    ImageProcessor,
    FeatureExtractor,
}

impl Default for ProcessorClass {
    fn default() -> Self {
        ProcessorClass::Auto
    }
}

impl ProcessorClass {
    #[must_use]
    pub fn auto_class(&self) -> &'static str {
        match self {
            ProcessorClass::Auto => "AutoProcessor",
            ProcessorClass::Tokenizer => "AutoTokenizer",
            ProcessorClass::ImageProcessor => "AutoImageProcessor",
            ProcessorClass::FeatureExtractor => "AutoFeatureExtractor",
        }
    }
}

impl fmt::Display for ProcessorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.auto_class())
    }
}

/// How to fetch one model from the hub.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ModelSpec {
    pub id: String,
    #[serde(default)]
    pub model_class: ModelClass,
    /// `None` skips the processor step entirely.
    #[serde(default = "default_processor_class")]
    pub processor_class: Option<ProcessorClass>,
    #[serde(default)]
    pub trust_remote_code: bool,
}

fn default_processor_class() -> Option<ProcessorClass> {
    Some(ProcessorClass::Auto)
}

impl ModelSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            model_class: ModelClass::default(),
            processor_class: default_processor_class(),
            trust_remote_code: false,
        }
    }

    #[must_use]
    pub fn with_model_class(mut self, class: ModelClass) -> Self {
        self.model_class = class;
        self
    }

    #[must_use]
    pub fn with_processor_class(mut self, class: ProcessorClass) -> Self {
        self.processor_class = Some(class);
        self
    }

    #[must_use]
    pub fn without_processor(mut self) -> Self {
        self.processor_class = None;
        self
    }

    #[must_use]
    pub fn trust_remote_code(mut self, trust: bool) -> Self {
        self.trust_remote_code = trust;
        self
    }

    #[must_use]
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            trust_remote_code: self.trust_remote_code.then_some(true),
        }
    }
}

/// Options forwarded to every loader call for a spec.
///
/// `trust_remote_code` is only present when it was switched on; an absent flag
/// means the hub client's own default (off).
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoadOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trust_remote_code: Option<bool>,
}

impl LoadOptions {
    #[must_use]
    pub fn trusts_remote_code(&self) -> bool {
        self.trust_remote_code.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_spec_uses_auto_loaders() {
        let spec = ModelSpec::new("openai/clip-vit-base-patch32");
        assert_eq!(spec.model_class, ModelClass::Auto);
        assert_eq!(spec.processor_class, Some(ProcessorClass::Auto));
        assert!(!spec.trust_remote_code);
    }

    #[test]
    fn trust_flag_is_omitted_unless_enabled() {
        let plain = ModelSpec::new("a/b").load_options();
        assert_eq!(plain.trust_remote_code, None);
        assert!(!plain.trusts_remote_code());
        assert_eq!(serde_json::to_string(&plain).unwrap(), "{}");

        let trusted = ModelSpec::new("a/b").trust_remote_code(true).load_options();
        assert_eq!(trusted.trust_remote_code, Some(true));
        assert!(trusted.trusts_remote_code());
    }

    #[test]
    fn missing_processor_defaults_but_null_disables() {
        let defaulted: ModelSpec = serde_json::from_str(r#"{"id":"a/b"}"#).unwrap();
        assert_eq!(defaulted.processor_class, Some(ProcessorClass::Auto));
        assert_eq!(defaulted.model_class, ModelClass::Auto);

        let disabled: ModelSpec =
            serde_json::from_str(r#"{"id":"a/b","processorClass":null}"#).unwrap();
        assert_eq!(disabled.processor_class, None);
    }

    #[test]
    fn explicit_fields_override_defaults() {
        let spec: ModelSpec = serde_json::from_str(
            r#"{"id":"a/b","modelClass":"causal-lm","processorClass":"tokenizer","trustRemoteCode":true}"#,
        )
        .unwrap();
        assert_eq!(spec.model_class, ModelClass::CausalLm);
        assert_eq!(spec.processor_class, Some(ProcessorClass::Tokenizer));
        assert!(spec.trust_remote_code);
    }

    #[test]
    fn generative_classes_are_flagged() {
        assert!(ModelClass::CausalLm.is_generative());
        assert!(!ModelClass::Auto.is_generative());
        assert_eq!(ModelClass::CausalLm.to_string(), "AutoModelForCausalLM");
    }
}
