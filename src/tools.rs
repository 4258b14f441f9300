//! The tool boundary: trait, registry, and the built-in contact tools.
//!
//! Every service operation is exposed as a named tool with a JSON-Schema
//! parameter description. Dispatch validates parameters against that
//! schema before execution, so type errors (a fractional `limit`, a
//! numeric `name`) are rejected at the boundary with the parameter name
//! in the message. Multi-valued contact fields accept one string or a
//! sequence of strings; deserialization normalizes both to a sequence
//! before anything reaches the service.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::Config;
use crate::models::{ContactDraft, ContactPatchEntry, ListParams};
use crate::service::ContactService;

// ═══════════════════════════════════════════════════════════════════════
// Tool Trait
// ═══════════════════════════════════════════════════════════════════════

/// A named tool that agents can discover and call.
///
/// Tools are registered at server startup and exposed via
/// `GET /tools/list` for discovery, `POST /tools/{name}` for invocation,
/// and the MCP bridge for JSON-RPC clients.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The tool's name — a lowercase identifier with underscores,
    /// used as the route path and in tool listings.
    fn name(&self) -> &str;

    /// One-line description for agent discovery.
    fn description(&self) -> &str;

    /// JSON Schema for the tool's parameters: an object schema with
    /// `properties` and optionally `required`.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with validated parameters.
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value>;
}

// ═══════════════════════════════════════════════════════════════════════
// ToolContext
// ═══════════════════════════════════════════════════════════════════════

/// Context bridge for tool execution.
///
/// Carries the application configuration into each invocation; tools
/// build a [`ContactService`] from it rather than reaching for any
/// ambient state.
pub struct ToolContext {
    config: Arc<Config>,
}

impl ToolContext {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    pub async fn service(&self) -> Result<ContactService> {
        ContactService::connect(&self.config).await
    }
}

// ═══════════════════════════════════════════════════════════════════════
// ToolRegistry
// ═══════════════════════════════════════════════════════════════════════

/// Holds the registered tools and resolves them by name.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// A registry preloaded with every contact tool.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(CreateContactTool));
        registry.register(Box::new(GetContactTool));
        registry.register(Box::new(UpdateContactTool));
        registry.register(Box::new(DeleteContactTool));
        registry.register(Box::new(ListContactsTool));
        registry.register(Box::new(SearchContactsTool));
        registry.register(Box::new(BulkCreateContactsTool));
        registry.register(Box::new(BulkUpdateContactsTool));
        registry.register(Box::new(BulkDeleteContactsTool));
        registry
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    pub fn tools(&self) -> &[Box<dyn Tool>] {
        &self.tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Parameter validation
// ═══════════════════════════════════════════════════════════════════════

/// Validate a parameter object against a tool's JSON schema.
///
/// Checks required fields, primitive types, and enum membership, and
/// injects declared defaults for absent properties. Properties without a
/// `type` key (the string-or-array contact fields) are passed through
/// for the tool's own deserialization to judge.
pub fn validate_params(schema: &Value, params: &Value) -> Result<Value> {
    let params_obj = params
        .as_object()
        .unwrap_or(&serde_json::Map::new())
        .clone();

    let properties = schema
        .get("properties")
        .and_then(|p| p.as_object())
        .cloned()
        .unwrap_or_default();

    let required: Vec<String> = schema
        .get("required")
        .and_then(|r| r.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default();

    let mut result = params_obj.clone();

    for req_field in &required {
        if !params_obj.contains_key(req_field) {
            bail!("missing required parameter: {}", req_field);
        }
    }

    for (prop_name, prop_schema) in &properties {
        if let Some(value) = params_obj.get(prop_name) {
            if let Some(expected_type) = prop_schema.get("type").and_then(|t| t.as_str()) {
                let type_ok = match expected_type {
                    "string" => value.is_string(),
                    "integer" => value.is_i64() || value.is_u64(),
                    "number" => value.is_number(),
                    "boolean" => value.is_boolean(),
                    "array" => value.is_array(),
                    "object" => value.is_object(),
                    _ => true,
                };
                if !type_ok {
                    bail!(
                        "parameter '{}' must be of type '{}', got {}",
                        prop_name,
                        expected_type,
                        json_type_name(value)
                    );
                }
            }

            if let Some(enum_values) = prop_schema.get("enum").and_then(|e| e.as_array()) {
                if !enum_values.contains(value) {
                    let allowed: Vec<String> = enum_values.iter().map(|v| v.to_string()).collect();
                    bail!(
                        "parameter '{}' must be one of [{}], got {}",
                        prop_name,
                        allowed.join(", "),
                        value
                    );
                }
            }
        } else if let Some(default) = prop_schema.get("default") {
            result.insert(prop_name.clone(), default.clone());
        }
    }

    Ok(Value::Object(result))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn parse<T: serde::de::DeserializeOwned>(params: Value) -> Result<T> {
    serde_json::from_value(params).map_err(|e| anyhow!("invalid parameters: {}", e))
}

/// Schema fragment for the string-or-array contact fields. No `type`
/// key: the union is checked by deserialization, not the validator.
fn string_or_array(description: &str) -> Value {
    json!({ "description": format!("{} (a string or an array of strings)", description) })
}

fn contact_field_properties() -> serde_json::Map<String, Value> {
    let mut props = serde_json::Map::new();
    props.insert("name".into(), json!({ "type": "string", "description": "Full name" }));
    props.insert("title".into(), json!({ "type": "string", "description": "Job title" }));
    props.insert("company".into(), json!({ "type": "string", "description": "Company or organization" }));
    props.insert("notes".into(), json!({ "type": "string", "description": "Free-form notes" }));
    props.insert("location".into(), json!({ "type": "string", "description": "Free-form location" }));
    props.insert("email".into(), string_or_array("Email addresses"));
    props.insert("phone".into(), string_or_array("Phone numbers"));
    props.insert("links".into(), string_or_array("Profile or website URLs"));
    props.insert("tags".into(), string_or_array("Labels for grouping"));
    props.insert(
        "birthdate".into(),
        json!({ "type": "string", "description": "Birthdate as YYYY-MM-DD" }),
    );
    props
}

// ═══════════════════════════════════════════════════════════════════════
// Built-in tools
// ═══════════════════════════════════════════════════════════════════════

pub struct CreateContactTool;

#[async_trait]
impl Tool for CreateContactTool {
    fn name(&self) -> &str {
        "create_contact"
    }

    fn description(&self) -> &str {
        "Create a contact. Only name is required; multi-valued fields accept a string or an array."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": contact_field_properties(),
            "required": ["name"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let draft: ContactDraft = parse(params)?;
        let contact = ctx.service().await?.create(draft).await?;
        Ok(serde_json::to_value(contact)?)
    }
}

pub struct GetContactTool;

#[async_trait]
impl Tool for GetContactTool {
    fn name(&self) -> &str {
        "get_contact"
    }

    fn description(&self) -> &str {
        "Fetch a contact by id. Returns null when no contact matches."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": { "type": "string", "description": "Contact id (UUID)" }
            },
            "required": ["id"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        #[derive(serde::Deserialize)]
        struct Params {
            id: String,
        }
        let p: Params = parse(params)?;
        match ctx.service().await?.get(&p.id).await? {
            Some(contact) => Ok(serde_json::to_value(contact)?),
            None => Ok(Value::Null),
        }
    }
}

pub struct UpdateContactTool;

#[async_trait]
impl Tool for UpdateContactTool {
    fn name(&self) -> &str {
        "update_contact"
    }

    fn description(&self) -> &str {
        "Update the provided fields of a contact. Absent fields are untouched; returns null when no contact matches."
    }

    fn parameters_schema(&self) -> Value {
        let mut props = contact_field_properties();
        props.insert(
            "id".into(),
            json!({ "type": "string", "description": "Contact id (UUID)" }),
        );
        json!({
            "type": "object",
            "properties": props,
            "required": ["id"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let entry: ContactPatchEntry = parse(params)?;
        match ctx.service().await?.update(&entry.id, entry.patch).await? {
            Some(contact) => Ok(serde_json::to_value(contact)?),
            None => Ok(Value::Null),
        }
    }
}

pub struct DeleteContactTool;

#[async_trait]
impl Tool for DeleteContactTool {
    fn name(&self) -> &str {
        "delete_contact"
    }

    fn description(&self) -> &str {
        "Delete a contact by id. Idempotent; reports whether a contact was actually removed."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": { "type": "string", "description": "Contact id (UUID)" }
            },
            "required": ["id"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        #[derive(serde::Deserialize)]
        struct Params {
            id: String,
        }
        let p: Params = parse(params)?;
        let deleted = ctx.service().await?.delete(&p.id).await?;
        Ok(json!({ "deleted": deleted }))
    }
}

pub struct ListContactsTool;

#[async_trait]
impl Tool for ListContactsTool {
    fn name(&self) -> &str {
        "list_contacts"
    }

    fn description(&self) -> &str {
        "List contacts, most recently updated first, with optional substring filter and pagination."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Case-insensitive substring matched against every field" },
                "limit": { "type": "integer", "description": "Page size (default 50)" },
                "offset": { "type": "integer", "description": "Rows to skip (default 0)" }
            },
            "required": []
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let list_params: ListParams = parse(params)?;
        let contacts = ctx.service().await?.list(list_params).await?;
        Ok(serde_json::to_value(contacts)?)
    }
}

pub struct SearchContactsTool;

#[async_trait]
impl Tool for SearchContactsTool {
    fn name(&self) -> &str {
        "search_contacts"
    }

    fn description(&self) -> &str {
        "Hybrid search: lexical substring matching merged with semantic similarity when embeddings are enabled."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Free-text search query" }
            },
            "required": []
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        #[derive(serde::Deserialize)]
        struct Params {
            #[serde(default)]
            query: Option<String>,
        }
        let p: Params = parse(params)?;
        let contacts = ctx.service().await?.search(p.query.as_deref()).await?;
        Ok(serde_json::to_value(contacts)?)
    }
}

pub struct BulkCreateContactsTool;

#[async_trait]
impl Tool for BulkCreateContactsTool {
    fn name(&self) -> &str {
        "bulk_create_contacts"
    }

    fn description(&self) -> &str {
        "Create many contacts in one transactional batch. The whole batch fails together."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "contacts": {
                    "type": "array",
                    "description": "Contact inputs; same shape as create_contact parameters"
                }
            },
            "required": ["contacts"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        #[derive(serde::Deserialize)]
        struct Params {
            contacts: Vec<ContactDraft>,
        }
        let p: Params = parse(params)?;
        let report = ctx.service().await?.bulk_create(p.contacts).await?;
        Ok(serde_json::to_value(report)?)
    }
}

pub struct BulkUpdateContactsTool;

#[async_trait]
impl Tool for BulkUpdateContactsTool {
    fn name(&self) -> &str {
        "bulk_update_contacts"
    }

    fn description(&self) -> &str {
        "Update many contacts sequentially. Misses are reported per entry with its position; the rest proceed."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "contacts": {
                    "type": "array",
                    "description": "Entries of contact id plus the fields to change"
                }
            },
            "required": ["contacts"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        #[derive(serde::Deserialize)]
        struct Params {
            contacts: Vec<ContactPatchEntry>,
        }
        let p: Params = parse(params)?;
        let report = ctx.service().await?.bulk_update(p.contacts).await?;
        Ok(serde_json::to_value(report)?)
    }
}

pub struct BulkDeleteContactsTool;

#[async_trait]
impl Tool for BulkDeleteContactsTool {
    fn name(&self) -> &str {
        "bulk_delete_contacts"
    }

    fn description(&self) -> &str {
        "Delete many contacts sequentially by id. Misses are reported per entry with its position."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "ids": {
                    "type": "array",
                    "description": "Contact ids to delete"
                }
            },
            "required": ["ids"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        #[derive(serde::Deserialize)]
        struct Params {
            ids: Vec<String>,
        }
        let p: Params = parse(params)?;
        let report = ctx.service().await?.bulk_delete(p.ids).await?;
        Ok(serde_json::to_value(report)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_has_all_contact_tools() {
        let registry = ToolRegistry::with_builtins();
        for name in [
            "create_contact",
            "get_contact",
            "update_contact",
            "delete_contact",
            "list_contacts",
            "search_contacts",
            "bulk_create_contacts",
            "bulk_update_contacts",
            "bulk_delete_contacts",
        ] {
            assert!(registry.find(name).is_some(), "missing tool: {}", name);
        }
        assert_eq!(registry.len(), 9);
    }

    #[test]
    fn test_validate_params_missing_required() {
        let registry = ToolRegistry::with_builtins();
        let schema = registry.find("get_contact").unwrap().parameters_schema();
        let err = validate_params(&schema, &json!({})).unwrap_err();
        assert!(err.to_string().contains("missing required parameter: id"));
    }

    #[test]
    fn test_validate_params_rejects_non_integer_limit() {
        let registry = ToolRegistry::with_builtins();
        let schema = registry.find("list_contacts").unwrap().parameters_schema();
        let err = validate_params(&schema, &json!({ "limit": 1.5 })).unwrap_err();
        assert!(err.to_string().contains("limit"));
        assert!(err.to_string().contains("integer"));
    }

    #[test]
    fn test_validate_params_rejects_wrong_type() {
        let registry = ToolRegistry::with_builtins();
        let schema = registry.find("create_contact").unwrap().parameters_schema();
        let err = validate_params(&schema, &json!({ "name": 42 })).unwrap_err();
        assert!(err.to_string().contains("'name'"));
    }

    #[test]
    fn test_validate_params_passes_union_fields_through() {
        let registry = ToolRegistry::with_builtins();
        let schema = registry.find("create_contact").unwrap().parameters_schema();

        // Both shapes of a multi-valued field survive validation.
        let single = validate_params(&schema, &json!({ "name": "Ada", "email": "a@b.c" })).unwrap();
        assert_eq!(single["email"], json!("a@b.c"));

        let many =
            validate_params(&schema, &json!({ "name": "Ada", "email": ["a@b.c", "d@e.f"] }))
                .unwrap();
        assert_eq!(many["email"], json!(["a@b.c", "d@e.f"]));
    }
}
