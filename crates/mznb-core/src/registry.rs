//! Named model sources defined by `%%mzn_model` cells.

use std::collections::HashMap;
use tracing::debug;

/// Name → model text store owned by a session.
///
/// References are consumed: [`take`](ModelRegistry::take) removes the entry,
/// so a named model is spliced into at most one later solve unless it is
/// defined again.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: HashMap<String, String>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `text` under `name`, replacing any previous definition.
    pub fn define(&mut self, name: impl Into<String>, text: impl Into<String>) {
        let name = name.into();
        debug!(model = %name, "defining named model");
        self.models.insert(name, text.into());
    }

    /// Look up and remove a named model.
    pub fn take(&mut self, name: &str) -> Option<String> {
        let found = self.models.remove(name);
        if found.is_none() {
            debug!(model = %name, "no named model registered; treating as a file");
        }
        found
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.models.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
