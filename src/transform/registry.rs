//! Pass registry
//!
//! Maps pass names to factories. A factory receives the pass's keyword
//! configuration and either builds the transformer or rejects the
//! configuration.

use std::fmt;

use indexmap::IndexMap;

use crate::error::{OptResult, TransformError};
use crate::traits::Transformer;
use crate::transformers::{PruneGraph, RefCntOptimizer};

use super::config::PassConfig;

/// Builds a transformer from its keyword configuration
pub type PassFactory = fn(&PassConfig) -> OptResult<Box<dyn Transformer>>;

/// Name → factory table
#[derive(Clone, Default)]
pub struct PassRegistry {
    factories: IndexMap<String, PassFactory>,
}

impl fmt::Debug for PassRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PassRegistry")
            .field("passes", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl PassRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in pass
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.factories.insert(
            RefCntOptimizer::NAME.to_string(),
            RefCntOptimizer::from_config,
        );
        registry
            .factories
            .insert(PruneGraph::NAME.to_string(), PruneGraph::from_config);
        registry
    }

    /// Register a pass; a name can only be registered once
    pub fn register(&mut self, name: impl Into<String>, factory: PassFactory) -> OptResult<()> {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(TransformError::DuplicatePass(name));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    /// Check if a pass is registered
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Build a pass
    pub fn create(&self, name: &str, config: &PassConfig) -> OptResult<Box<dyn Transformer>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| TransformError::UnknownPass(name.to_string()))?;
        factory(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;

    struct Noop;

    impl Transformer for Noop {
        fn name(&self) -> &str {
            "noop"
        }

        fn transform(&self, graph: &Graph) -> OptResult<Graph> {
            Ok(graph.clone())
        }
    }

    fn noop_factory(_config: &PassConfig) -> OptResult<Box<dyn Transformer>> {
        Ok(Box::new(Noop))
    }

    #[test]
    fn test_defaults() {
        let registry = PassRegistry::with_defaults();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["refcnt", "prune"]);
    }

    #[test]
    fn test_register_and_create() {
        let mut registry = PassRegistry::new();
        registry.register("noop", noop_factory).unwrap();

        let pass = registry.create("noop", &PassConfig::new()).unwrap();
        assert_eq!(pass.name(), "noop");
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = PassRegistry::with_defaults();
        assert!(matches!(
            registry.register("refcnt", noop_factory),
            Err(TransformError::DuplicatePass(name)) if name == "refcnt"
        ));
    }

    #[test]
    fn test_unknown_pass() {
        let registry = PassRegistry::with_defaults();
        assert!(matches!(
            registry.create("fold_constants", &PassConfig::new()),
            Err(TransformError::UnknownPass(_))
        ));
    }
}
