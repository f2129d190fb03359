//! Explicit component registry.
//!
//! Components are registered under a category key at startup. Resolving a list
//! of categories yields the registered implementations of each one, and a
//! category with nothing registered stands for itself through a fallback.

use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ComponentRegistry<T> {
    entries: BTreeMap<String, Vec<T>>,
}

impl<T> Default for ComponentRegistry<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T> ComponentRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `item` under `category`, after anything registered before it
    pub fn register(&mut self, category: impl Into<String>, item: T) {
        let category = category.into();
        debug!("Registering component under '{}'", category);
        self.entries.entry(category).or_default().push(item);
    }

    /// Registered implementations for `category`, in registration order
    pub fn implementations(&self, category: &str) -> &[T] {
        self.entries
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains(&self, category: &str) -> bool {
        !self.implementations(category).is_empty()
    }

    /// Categories with at least one registration, sorted
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Implementations of every category in order; categories with none
    /// registered contribute `fallback(category)` instead.
    pub fn resolve<S, F>(&self, categories: &[S], mut fallback: F) -> Vec<T>
    where
        T: Clone,
        S: AsRef<str>,
        F: FnMut(&str) -> T,
    {
        let mut resolved = Vec::new();
        for category in categories {
            let category = category.as_ref();
            match self.implementations(category) {
                [] => resolved.push(fallback(category)),
                found => resolved.extend_from_slice(found),
            }
        }
        resolved
    }
}
