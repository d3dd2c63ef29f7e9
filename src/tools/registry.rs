//! Tool registry

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, RwLock};

use crate::error::LlmError;
use crate::types::{ParameterSchema, ToolSpec};

/// Executable body of a tool.
#[async_trait]
pub trait ToolFunction: Send + Sync {
    /// Run the tool with validated arguments and return a JSON result.
    async fn call(&self, arguments: Map<String, Value>) -> Result<Value, LlmError>;
}

/// Adapter turning an async closure into a [`ToolFunction`].
pub struct FnTool<F>(pub F);

#[async_trait]
impl<F, Fut> ToolFunction for FnTool<F>
where
    F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, LlmError>> + Send + 'static,
{
    async fn call(&self, arguments: Map<String, Value>) -> Result<Value, LlmError> {
        (self.0)(arguments).await
    }
}

/// A registered tool: its advertised spec plus the function that runs it.
#[derive(Clone)]
pub struct ToolDefinition {
    pub spec: ToolSpec,
    pub function: Arc<dyn ToolFunction>,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ParameterSchema,
        function: Arc<dyn ToolFunction>,
    ) -> Self {
        Self {
            spec: ToolSpec {
                name: name.into(),
                description: description.into(),
                parameters,
            },
            function,
        }
    }

    /// Define a tool from an async closure.
    pub fn from_fn<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ParameterSchema,
        f: F,
    ) -> Self
    where
        F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, LlmError>> + Send + 'static,
    {
        Self::new(name, description, parameters, Arc::new(FnTool(f)))
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }
}

impl std::fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

/// Exact-name tool lookup shared by a client and its pipelines.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: RwLock<BTreeMap<String, ToolDefinition>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, returning the definition it replaced.
    pub fn add(&self, tool: ToolDefinition) -> Option<ToolDefinition> {
        self.write().insert(tool.spec.name.clone(), tool)
    }

    pub fn remove(&self, name: &str) -> Option<ToolDefinition> {
        self.write().remove(name)
    }

    pub fn resolve(&self, name: &str) -> Option<ToolDefinition> {
        self.read().get(name).cloned()
    }

    /// Specs of every registered tool, sorted by name.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.read().values().map(|t| t.spec.clone()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, ToolDefinition>> {
        self.tools.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, ToolDefinition>> {
        self.tools.write().unwrap_or_else(|p| p.into_inner())
    }
}
