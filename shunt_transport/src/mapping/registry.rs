use crate::mapping::mapper::{ContextMapper, DefaultMapper};
use parking_lot::RwLock;
use shunt_core::CaselessMap;
use std::sync::Arc;

/// A registry of [`ContextMapper`]s keyed by `(source, target)` transport
/// pair, with a single wildcard default for unknown pairs.
///
/// Pair lookup is case-insensitive on both names.
pub struct MapperRegistry {
    mappers: RwLock<CaselessMap<Arc<dyn ContextMapper>>>,
    fallback: Arc<dyn ContextMapper>,
}

impl MapperRegistry {
    /// Creates a registry whose wildcard default is the base
    /// [`DefaultMapper`].
    pub fn new() -> Self {
        Self::with_fallback(Arc::new(DefaultMapper))
    }

    /// Creates a registry with the given wildcard default.
    pub fn with_fallback(fallback: Arc<dyn ContextMapper>) -> Self {
        Self {
            mappers: RwLock::new(CaselessMap::new()),
            fallback,
        }
    }

    /// Registers a mapper for the given `(source, target)` pair, replacing
    /// any previous one.
    pub fn register(&self, source: &str, target: &str, mapper: Arc<dyn ContextMapper>) {
        self.mappers.write().insert(Self::pair(source, target), mapper);
    }

    /// Returns the mapper for the given pair, or the wildcard default when
    /// no specific one is registered.
    pub fn get_mapper(&self, source: &str, target: &str) -> Arc<dyn ContextMapper> {
        self.mappers
            .read()
            .get(&Self::pair(source, target))
            .map(Arc::clone)
            .unwrap_or_else(|| Arc::clone(&self.fallback))
    }

    /// Composes the lookup key of a pair. The `->` separator never appears
    /// in transport names, so pairs cannot collide.
    fn pair(source: &str, target: &str) -> String {
        format!("{}->{}", source, target)
    }
}

impl Default for MapperRegistry {
    fn default() -> Self {
        Self::new()
    }
}
