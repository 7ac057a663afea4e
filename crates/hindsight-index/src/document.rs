use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use hindsight_types::{EventType, TraceEvent};

/// Scalar metadata value attached to an indexed document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl From<bool> for MetaValue {
    fn from(v: bool) -> Self {
        MetaValue::Bool(v)
    }
}

impl From<i64> for MetaValue {
    fn from(v: i64) -> Self {
        MetaValue::Int(v)
    }
}

impl From<&str> for MetaValue {
    fn from(v: &str) -> Self {
        MetaValue::Str(v.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(v: String) -> Self {
        MetaValue::Str(v)
    }
}

/// Flat metadata map; reserved keys include `eventType`, `toolName`,
/// `isError`, `outcome`, and the `swebench*` family.
pub type Metadata = BTreeMap<String, MetaValue>;

/// Projection of one trace event for retrieval
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedDocument {
    /// `<eventId>:<variant>`, at minimum `:base`
    pub id: String,

    pub source_event_id: String,

    /// Normalized textual projection of the event
    pub text: String,

    #[serde(default)]
    pub metadata: Metadata,
}

impl IndexedDocument {
    /// A document matches a filter when every specified key/value pair is an
    /// equal scalar. Documents without metadata fail any non-empty filter.
    pub fn matches_filter(&self, filter: &Metadata) -> bool {
        filter
            .iter()
            .all(|(key, value)| self.metadata.get(key) == Some(value))
    }
}

/// Parsed components of a `swebench::<instance>::<variant>::<replicate?>`
/// session id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwebenchSession {
    pub instance_id: String,
    pub variant: String,
    pub replicate: Option<String>,
}

/// Parse a SWE-bench session id, if the session follows the convention.
pub fn parse_swebench_session(session_id: &str) -> Option<SwebenchSession> {
    let parts: Vec<&str> = session_id.split("::").collect();
    if parts.len() < 3 || parts.len() > 4 || parts[0] != "swebench" {
        return None;
    }
    if parts[1].is_empty() || parts[2].is_empty() {
        return None;
    }
    Some(SwebenchSession {
        instance_id: parts[1].to_string(),
        variant: parts[2].to_string(),
        replicate: parts.get(3).map(|s| s.to_string()),
    })
}

/// Builds retrieval documents from events. The projection is deterministic
/// and idempotent: the same event produces byte-identical documents.
#[derive(Debug, Clone, Default)]
pub struct DocumentBuilder;

impl DocumentBuilder {
    pub fn new() -> Self {
        Self
    }

    /// One base document per event plus a command variant for tool results
    /// that carry a command payload.
    pub fn build(&self, event: &TraceEvent) -> Vec<IndexedDocument> {
        let metadata = self.base_metadata(event);
        let mut documents = vec![IndexedDocument {
            id: format!("{}:base", event.id),
            source_event_id: event.id.clone(),
            text: self.base_text(event),
            metadata: metadata.clone(),
        }];

        if event.event_type == EventType::ToolResult {
            if let Some(command) = event.command() {
                let mut text = command.to_string();
                if let Some(first_line) = event.output_text().and_then(|o| o.lines().next()) {
                    text.push('\n');
                    text.push_str(first_line);
                }
                documents.push(IndexedDocument {
                    id: format!("{}:cmd", event.id),
                    source_event_id: event.id.clone(),
                    text,
                    metadata,
                });
            }
        }

        documents
    }

    fn base_text(&self, event: &TraceEvent) -> String {
        let mut parts = Vec::new();
        if let Some(command) = event.command() {
            parts.push(command.to_string());
        }
        if let Some(first_line) = event.output_text().and_then(|o| o.lines().next()) {
            parts.push(first_line.to_string());
        }
        // serde_json::Map is BTreeMap-backed, so this serialization is
        // key-ordered and byte-stable for a given payload.
        parts.push(serde_json::Value::Object(event.payload.clone()).to_string());
        parts.join("\n")
    }

    fn base_metadata(&self, event: &TraceEvent) -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert("eventType".to_string(), event.event_type.as_str().into());

        if let Some(tool_name) = event.tool_name() {
            metadata.insert("toolName".to_string(), tool_name.into());
        }

        if event.event_type == EventType::ToolResult {
            metadata.insert("isError".to_string(), event.is_error().into());
            metadata.insert("outcome".to_string(), event.outcome().as_str().into());
        }

        if let Some(swebench) = parse_swebench_session(&event.session_id) {
            metadata.insert(
                "swebenchInstanceId".to_string(),
                swebench.instance_id.into(),
            );
            metadata.insert("swebenchVariant".to_string(), swebench.variant.into());
            if let Some(replicate) = swebench.replicate {
                metadata.insert("swebenchReplicate".to_string(), replicate.into());
            }
        }

        metadata
    }
}
