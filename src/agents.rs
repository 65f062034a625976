use std::fmt;

use crate::schema::FieldSchema;
use crate::tools::{DynSimTool, ToolCatalog};

/// Declared capability set of one agent: its system instruction, its tool
/// catalog, and optional structural schemas for the session's query and final
/// response.
#[derive(Clone)]
pub struct AgentProfile {
    name: String,
    description: Option<String>,
    instruction: String,
    tools: ToolCatalog,
    input_schema: Option<FieldSchema>,
    output_schema: Option<FieldSchema>,
}

impl fmt::Debug for AgentProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentProfile")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("tools", &self.tools)
            .field("has_input_schema", &self.input_schema.is_some())
            .field("has_output_schema", &self.output_schema.is_some())
            .finish()
    }
}

impl AgentProfile {
    pub fn new(name: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            instruction: instruction.into(),
            tools: ToolCatalog::new(),
            input_schema: None,
            output_schema: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tool(mut self, tool: DynSimTool) -> Self {
        self.tools.register(tool);
        self
    }

    pub fn with_tool_catalog(mut self, tools: ToolCatalog) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_input_schema(mut self, schema: FieldSchema) -> Self {
        self.input_schema = Some(schema);
        self
    }

    pub fn with_output_schema(mut self, schema: FieldSchema) -> Self {
        self.output_schema = Some(schema);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn tools(&self) -> &ToolCatalog {
        &self.tools
    }

    pub fn input_schema(&self) -> Option<&FieldSchema> {
        self.input_schema.as_ref()
    }

    pub fn output_schema(&self) -> Option<&FieldSchema> {
        self.output_schema.as_ref()
    }
}

/// Named profiles the controller selects from, in registration order.
#[derive(Debug, Clone, Default)]
pub struct AgentDirectory {
    profiles: Vec<AgentProfile>,
}

impl AgentDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, profile: AgentProfile) {
        match self
            .profiles
            .iter_mut()
            .find(|existing| existing.name() == profile.name())
        {
            Some(slot) => *slot = profile,
            None => self.profiles.push(profile),
        }
    }

    pub fn with_profile(mut self, profile: AgentProfile) -> Self {
        self.register(profile);
        self
    }

    pub fn get(&self, name: &str) -> Option<&AgentProfile> {
        self.profiles.iter().find(|profile| profile.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.profiles.iter().map(AgentProfile::name).collect()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
