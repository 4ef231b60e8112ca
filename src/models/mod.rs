mod catalog;
mod spec;

pub use catalog::{advanced_models, combine, default_catalog, SIMPLE_MODELS};
pub use spec::{LoadOptions, ModelClass, ModelSpec, ProcessorClass};
