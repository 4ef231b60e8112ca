use super::spec::{ModelClass, ModelSpec};

/// Models fetched with the generic loaders and no extra options.
pub const SIMPLE_MODELS: &[&str] = &["openai/clip-vit-base-patch32"];

/// Models that need a specific loader or hub-hosted code.
pub fn advanced_models() -> Vec<ModelSpec> {
    vec![ModelSpec::new("microsoft/Florence-2-large")
        .with_model_class(ModelClass::CausalLm)
        .trust_remote_code(true)]
}

/// Simple ids first, then advanced specs, each in declaration order.
/// Duplicates are kept.
pub fn combine(simple: &[&str], advanced: Vec<ModelSpec>) -> Vec<ModelSpec> {
    simple
        .iter()
        .map(|id| ModelSpec::new(*id))
        .chain(advanced)
        .collect()
}

pub fn default_catalog() -> Vec<ModelSpec> {
    combine(SIMPLE_MODELS, advanced_models())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProcessorClass;

    #[test]
    fn simple_entries_get_default_fields() {
        let specs = combine(&["a/one", "b/two"], vec![]);
        for spec in &specs {
            assert_eq!(spec.model_class, ModelClass::Auto);
            assert_eq!(spec.processor_class, Some(ProcessorClass::Auto));
            assert!(!spec.trust_remote_code);
        }
    }

    #[test]
    fn order_is_simple_then_advanced_without_dedup() {
        let advanced = vec![
            ModelSpec::new("c/three").without_processor(),
            ModelSpec::new("a/one").trust_remote_code(true),
        ];
        let ids: Vec<_> = combine(&["a/one", "b/two"], advanced)
            .into_iter()
            .map(|spec| spec.id)
            .collect();
        assert_eq!(ids, ["a/one", "b/two", "c/three", "a/one"]);
    }

    #[test]
    fn builtin_catalog_keeps_florence_options() {
        let catalog = default_catalog();
        assert_eq!(catalog.len(), SIMPLE_MODELS.len() + 1);
        let florence = catalog.last().unwrap();
        assert_eq!(florence.id, "microsoft/Florence-2-large");
        assert_eq!(florence.model_class, ModelClass::CausalLm);
        assert_eq!(florence.processor_class, Some(ProcessorClass::Auto));
        assert!(florence.trust_remote_code);
    }

    #[test]
    fn empty_lists_combine_to_nothing() {
        assert!(combine(&[], vec![]).is_empty());
    }
}
