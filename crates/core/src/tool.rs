//! Tool model — definitions, call requests, outcomes and the registry.
//!
//! Tools are the only way the orchestrator acts in the world: document
//! search, external code search, memory reads and writes. Each tool is an
//! explicitly registered `(ToolDefinition, ToolCapability)` pair; there is
//! no ambient global registry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::agent::TenantScope;
use crate::error::{RegistryError, ToolError};

/// Tool arguments: a JSON object keyed by parameter name.
pub type Arguments = serde_json::Map<String, serde_json::Value>;

/// The JSON type a tool parameter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    /// Whether `value` is acceptable for this type.
    ///
    /// Integers are accepted where a number is expected; the reverse is not.
    pub fn accepts(&self, value: &serde_json::Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parameter in a tool's schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,

    #[serde(rename = "type")]
    pub param_type: ParamType,

    #[serde(default)]
    pub required: bool,

    /// Injected by the executor when the parameter is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl ParameterSpec {
    pub fn required(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            param_type,
            required: true,
            default: None,
            description: String::new(),
        }
    }

    pub fn optional(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type)
        }
    }

    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A tool as described to the reasoning capability. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique, stable identifier
    pub name: String,

    /// What the tool does (for the reasoning capability's benefit)
    pub description: String,

    /// Ordered parameter list
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    pub fn param(mut self, spec: ParameterSpec) -> Self {
        self.parameters.push(spec);
        self
    }

    /// Render the parameter list as a JSON Schema object.
    pub fn json_schema(&self) -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        for p in &self.parameters {
            let mut prop = serde_json::Map::new();
            prop.insert("type".into(), p.param_type.as_str().into());
            if !p.description.is_empty() {
                prop.insert("description".into(), p.description.clone().into());
            }
            if let Some(default) = &p.default {
                prop.insert("default".into(), default.clone());
            }
            properties.insert(p.name.clone(), serde_json::Value::Object(prop));
            if p.required {
                required.push(serde_json::Value::String(p.name.clone()));
            }
        }
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// A request to execute a tool, parsed from a reasoning-capability reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Call id pairing the issued call with its result
    pub id: String,

    pub tool_name: String,

    #[serde(default)]
    pub arguments: Arguments,

    /// Free-text rationale from the reasoning capability. Never executed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_trace: Option<String>,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, tool_name: impl Into<String>, arguments: Arguments) -> Self {
        Self {
            id: id.into(),
            tool_name: tool_name.into(),
            arguments,
            reasoning_trace: None,
        }
    }
}

/// A scored reference to a document chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub document_id: String,
    pub chunk_index: usize,
    pub score: f32,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
}

impl Citation {
    /// Stable dedup key: document + chunk.
    pub fn fingerprint(&self) -> (&str, usize) {
        (&self.document_id, self.chunk_index)
    }
}

/// What a capability returns on success.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Human-readable text for prompt re-insertion
    pub content: String,

    /// Structured payload for programmatic consumers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
}

impl ToolOutput {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_citations(mut self, citations: Vec<Citation>) -> Self {
        self.citations = citations;
        self
    }
}

/// The normalized result of one tool call.
///
/// Built only through [`ToolOutcome::success`] and [`ToolOutcome::failure`]:
/// a successful outcome never carries an error, a failed one always does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub success: bool,

    #[serde(default)]
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_data: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
}

impl ToolOutcome {
    pub fn success(output: ToolOutput) -> Self {
        Self {
            success: true,
            content: output.content,
            structured_data: output.data,
            error: None,
            citations: output.citations,
        }
    }

    pub fn failure(error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            content: String::new(),
            structured_data: None,
            error: Some(error.to_string()),
            citations: Vec::new(),
        }
    }

    /// The text shown to the reasoning capability for this outcome.
    pub fn prompt_text(&self) -> String {
        match &self.error {
            Some(error) => format!("Error: {error}"),
            None => self.content.clone(),
        }
    }
}

/// Per-call context handed to a capability.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    pub tenant: TenantScope,

    /// Fires when the owning invocation is cancelled. Honouring it is best-effort.
    pub cancel: CancellationToken,
}

/// An executable tool capability.
///
/// Implementations may hit the network, run vector searches, or mutate
/// external state. They must tolerate being dropped mid-flight (timeout or
/// cancellation).
#[async_trait]
pub trait ToolCapability: Send + Sync {
    async fn invoke(&self, arguments: Arguments, ctx: &ToolContext) -> Result<ToolOutput, ToolError>;
}

/// A catalog of available tools, in registration order.
///
/// Built once at startup, then shared read-only (`Arc<ToolRegistry>`) across
/// concurrent orchestrations.
#[derive(Default)]
pub struct ToolRegistry {
    definitions: Vec<ToolDefinition>,
    capabilities: HashMap<String, Arc<dyn ToolCapability>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Fails if the name is already taken.
    pub fn register(
        &mut self,
        definition: ToolDefinition,
        capability: Arc<dyn ToolCapability>,
    ) -> Result<(), RegistryError> {
        if self.capabilities.contains_key(&definition.name) {
            return Err(RegistryError::DuplicateTool(definition.name));
        }
        tracing::debug!(tool = %definition.name, "Registered tool");
        self.capabilities.insert(definition.name.clone(), capability);
        self.definitions.push(definition);
        Ok(())
    }

    /// Look up a capability by tool name.
    pub fn lookup(&self, name: &str) -> Result<Arc<dyn ToolCapability>, RegistryError> {
        self.capabilities
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// The definition registered under `name`.
    pub fn definition(&self, name: &str) -> Option<&ToolDefinition> {
        self.definitions.iter().find(|d| d.name == name)
    }

    /// All definitions in registration order.
    pub fn list(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.definitions.iter().map(|d| &d.name).collect::<Vec<_>>())
            .finish()
    }
}
