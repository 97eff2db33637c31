//! Function registry: a plain name-to-implementation map.
//!
//! The original had a reflective fallback that would instantiate a
//! function by class name when it wasn't already registered. This crate
//! drops that: an unresolved name is always `ProvenanceError::UnknownFunction`.
//! Register every function your process needs to re-run before resolving
//! against it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::{ProvenanceError, Result};
use crate::version::Version;

/// A tracked, callable function. Operates over `serde_json::Value` at the
/// registry boundary since a registry holds functions of differing input
/// and output types side by side; `prov_engine` is responsible for
/// encoding/decoding a specific function's typed inputs and outputs
/// through this boundary.
#[async_trait]
pub trait Function: Send + Sync {
    fn name(&self) -> &str;

    fn version(&self) -> Version;

    async fn call(&self, inputs: Vec<Value>) -> Result<Value>;
}

/// Name -> implementation map. Registration is last-write-wins; callers
/// that need to reject accidental re-registration should check
/// [`FunctionRegistry::contains`] first.
#[derive(Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<dyn Function>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    pub fn register(&mut self, function: Arc<dyn Function>) {
        self.functions.insert(function.name().to_string(), function);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Function>> {
        self.functions.get(name).cloned().ok_or_else(|| {
            debug!(function_name = name, "no reflective fallback, registration required");
            ProvenanceError::UnknownFunction(name.to_string())
        })
    }
}
