//! Namespace lookups and the generated data artifact.

use crate::error::{MznError, MznResult};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The interactive namespace a session reads inputs from and binds into.
pub trait Namespace {
    fn get(&self, name: &str) -> Option<Value>;

    fn set(&mut self, name: &str, value: Value);

    fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

impl Namespace for BTreeMap<String, Value> {
    fn get(&self, name: &str) -> Option<Value> {
        BTreeMap::get(self, name).cloned()
    }

    fn set(&mut self, name: &str, value: Value) {
        self.insert(name.to_string(), value);
    }

    fn contains(&self, name: &str) -> bool {
        self.contains_key(name)
    }
}

impl Namespace for HashMap<String, Value> {
    fn get(&self, name: &str) -> Option<Value> {
        HashMap::get(self, name).cloned()
    }

    fn set(&mut self, name: &str, value: Value) {
        self.insert(name.to_string(), value);
    }

    fn contains(&self, name: &str) -> bool {
        self.contains_key(name)
    }
}

/// Required inputs reported by an interface-only compile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelInterface {
    /// Input parameter names, in reported order.
    pub input: Vec<String>,
    /// Output variable names, when the toolchain reports them.
    pub output: Vec<String>,
    /// Problem method (`sat`, `min`, `max`), when reported.
    pub method: Option<String>,
}

#[derive(Deserialize)]
struct RawInterface {
    #[serde(default)]
    input: Value,
    #[serde(default)]
    output: Value,
    #[serde(default)]
    method: Option<String>,
}

impl ModelInterface {
    /// Parse the interface document printed by the compiler.
    ///
    /// `input`/`output` may be a list of names or an object keyed by name
    /// (newer toolchains attach type information to each entry).
    pub fn parse(bytes: &[u8]) -> MznResult<Self> {
        let raw: RawInterface = serde_json::from_slice(bytes).map_err(MznError::Interface)?;
        Ok(Self {
            input: names_of(raw.input),
            output: names_of(raw.output),
            method: raw.method,
        })
    }
}

fn names_of(value: Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(name) => Some(name),
                _ => None,
            })
            .collect(),
        Value::Object(map) => map.into_iter().map(|(name, _)| name).collect(),
        _ => Vec::new(),
    }
}

/// Values resolved for every required input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings(Map<String, Value>);

impl Bindings {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Write the data artifact, or nothing for an empty binding set.
    ///
    /// Returns the path to hand to the compiler; `None` means no data
    /// argument must be passed at all.
    pub fn write_data_file(&self, path: &Path) -> MznResult<Option<PathBuf>> {
        if self.is_empty() {
            return Ok(None);
        }
        let body =
            serde_json::to_string(&self.0).map_err(|e| MznError::Serialization(e.to_string()))?;
        fs::write(path, body)?;
        debug!(path = %path.display(), bindings = self.len(), "wrote data artifact");
        Ok(Some(path.to_path_buf()))
    }
}

/// Look up every required input in `namespace`.
///
/// Fails with every unresolved name, in interface order, rather than the
/// first one; nothing is bound in that case.
pub fn resolve_bindings(
    interface: &ModelInterface,
    namespace: &dyn Namespace,
) -> MznResult<Bindings> {
    let mut bindings = Map::new();
    let mut missing = Vec::new();

    for name in &interface.input {
        match namespace.get(name) {
            Some(value) => {
                bindings.insert(name.clone(), value);
            }
            None => missing.push(name.clone()),
        }
    }

    if !missing.is_empty() {
        return Err(MznError::UnresolvedBindings(missing));
    }
    Ok(Bindings(bindings))
}
