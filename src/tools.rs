use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::ToolFailure;
use crate::schema::FieldSchema;

/// Declared shape of one externally invokable capability.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parameters: FieldSchema,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, parameters: FieldSchema) -> Self {
        Self {
            name: name.into(),
            description: None,
            parameters,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Narrow interface over the host framework's invocation primitive.
///
/// The engine never reflects over the backing implementation; it sees the
/// declared descriptor and a single async call that either yields a JSON value
/// or a [`ToolFailure`].
#[async_trait]
pub trait SimTool: Send + Sync {
    fn descriptor(&self) -> ToolDescriptor;

    async fn invoke(&self, arguments: &Value) -> Result<Value, ToolFailure>;
}

pub type DynSimTool = Arc<dyn SimTool>;

/// Wrap an async closure as a [`SimTool`].
pub fn tool_fn<F, Fut>(descriptor: ToolDescriptor, handler: F) -> DynSimTool
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ToolFailure>> + Send + 'static,
{
    Arc::new(FnTool { descriptor, handler })
}

struct FnTool<F> {
    descriptor: ToolDescriptor,
    handler: F,
}

#[async_trait]
impl<F, Fut> SimTool for FnTool<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ToolFailure>> + Send + 'static,
{
    fn descriptor(&self) -> ToolDescriptor {
        self.descriptor.clone()
    }

    async fn invoke(&self, arguments: &Value) -> Result<Value, ToolFailure> {
        (self.handler)(arguments.clone()).await
    }
}

/// Ordered collection of tools declared by one agent.
///
/// Registration order is preserved; re-registering a name replaces the tool in
/// place so the catalog keeps its presentation order.
#[derive(Clone, Default)]
pub struct ToolCatalog {
    tools: Vec<DynSimTool>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: DynSimTool) {
        let name = tool.descriptor().name;
        match self
            .tools
            .iter_mut()
            .find(|existing| existing.descriptor().name == name)
        {
            Some(slot) => *slot = tool,
            None => self.tools.push(tool),
        }
    }

    pub fn with_tool(mut self, tool: DynSimTool) -> Self {
        self.register(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<&DynSimTool> {
        self.tools
            .iter()
            .find(|tool| tool.descriptor().name == name)
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|tool| tool.descriptor()).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DynSimTool> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl fmt::Debug for ToolCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self
            .tools
            .iter()
            .map(|tool| tool.descriptor().name)
            .collect();
        f.debug_struct("ToolCatalog").field("tools", &names).finish()
    }
}
