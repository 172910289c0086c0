//! Process-wide grammar cache.
//!
//! Grammars are validated once and then shared read-only, keyed by
//! [`GrammarId`] (name and table version). The first load of an identity
//! wins: later loads return the cached grammar and are never re-validated.
//!
//! # Usage
//!
//! ```ignore
//! use arbor::grammar::{GrammarId, GrammarRegistry};
//!
//! let grammar = GrammarRegistry::global().load_file("grammars/assign.json")?;
//! let again = GrammarRegistry::global().get(&GrammarId::new("assign", 1)).unwrap();
//! assert!(Arc::ptr_eq(&grammar, &again));
//! ```

use std::path::Path;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::{Grammar, GrammarError, GrammarId, GrammarSource};

static GLOBAL: LazyLock<GrammarRegistry> = LazyLock::new(GrammarRegistry::new);

/// A read-mostly map from grammar identity to loaded grammar.
#[derive(Debug, Default)]
pub struct GrammarRegistry {
    grammars: RwLock<FxHashMap<GrammarId, Arc<Grammar>>>,
}

impl GrammarRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by the whole process.
    pub fn global() -> &'static GrammarRegistry {
        &GLOBAL
    }

    pub fn get(&self, id: &GrammarId) -> Option<Arc<Grammar>> {
        self.grammars.read().get(id).cloned()
    }

    /// The newest loaded table version of the grammar called `name`.
    pub fn latest(&self, name: &str) -> Option<Arc<Grammar>> {
        self.grammars
            .read()
            .iter()
            .filter(|(id, _)| id.name == name)
            .max_by_key(|(id, _)| id.version)
            .map(|(_, grammar)| grammar.clone())
    }

    pub fn len(&self) -> usize {
        self.grammars.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.grammars.read().is_empty()
    }

    /// Identities of all loaded grammars, sorted.
    pub fn ids(&self) -> Vec<GrammarId> {
        let mut ids: Vec<_> = self.grammars.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Validate and register an artifact, or return the grammar already
    /// registered under its identity.
    pub fn load(&self, source: GrammarSource) -> Result<Arc<Grammar>, GrammarError> {
        let id = GrammarId::new(source.name.as_str(), source.version);
        self.get_or_load(&id, move || Ok(source))
    }

    pub fn load_json(&self, json: &str) -> Result<Arc<Grammar>, GrammarError> {
        self.load(GrammarSource::from_json(json)?)
    }

    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Arc<Grammar>, GrammarError> {
        let json = std::fs::read_to_string(path)?;
        self.load_json(&json)
    }

    /// Return the grammar registered as `id`, producing and validating its
    /// artifact with `source` only if it is not loaded yet.
    pub fn get_or_load(
        &self,
        id: &GrammarId,
        source: impl FnOnce() -> Result<GrammarSource, GrammarError>,
    ) -> Result<Arc<Grammar>, GrammarError> {
        if let Some(grammar) = self.get(id) {
            return Ok(grammar);
        }

        // Validation runs outside the lock; a racing loader may finish first.
        let grammar = Arc::new(Grammar::from_source(source()?)?);
        if grammar.id() != id {
            return Err(GrammarError::IdentityMismatch {
                expected: id.clone(),
                found: grammar.id().clone(),
            });
        }
        let mut grammars = self.grammars.write();
        let entry = grammars
            .entry(id.clone())
            .or_insert_with(|| {
                tracing::debug!(grammar = %id, "registered grammar");
                grammar
            })
            .clone();
        Ok(entry)
    }
}
