//! Response contracts: the named JSON schemas pinned onto every completion,
//! and the typed shapes the returned content parses into.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use bridgesheet_engine::binder::FieldUpdate;

/// A named strict schema sent as the `response_format` of a completion.
#[derive(Debug, Clone)]
pub struct ResponseContract {
    pub name: &'static str,
    pub schema: serde_json::Value,
}

/// Conversation turns: a reply for the user plus zero or more field writes.
pub fn sheet_update() -> ResponseContract {
    ResponseContract {
        name: "sheet_update",
        schema: serde_json::json!({
            "type": "object",
            "properties": {
                "message": {"type": "string"},
                "updates": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "field_id": {"type": "string"},
                            "value": {"type": "string"},
                        },
                        "required": ["field_id", "value"],
                        "additionalProperties": false,
                    },
                },
            },
            "required": ["message", "updates"],
            "additionalProperties": false,
        }),
    }
}

/// Opening question of a hearing: message only, no writes.
pub fn initial_question() -> ResponseContract {
    ResponseContract {
        name: "initial_question",
        schema: serde_json::json!({
            "type": "object",
            "properties": {
                "message": {"type": "string"},
            },
            "required": ["message"],
            "additionalProperties": false,
        }),
    }
}

/// Bulk import: a flat field-id to value map extracted from the material.
pub fn bulk_input_result() -> ResponseContract {
    ResponseContract {
        name: "bulk_input_result",
        schema: serde_json::json!({
            "type": "object",
            "properties": {
                "fields": {
                    "type": "object",
                    "additionalProperties": {"type": "string"},
                },
            },
            "required": ["fields"],
            "additionalProperties": false,
        }),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetUpdateResponse {
    pub message: String,
    #[serde(default)]
    pub updates: Vec<FieldUpdate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialQuestionResponse {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkInputResponse {
    /// Field code → extracted value. BTreeMap keeps apply order stable.
    pub fields: BTreeMap<String, String>,
}

impl BulkInputResponse {
    pub fn into_updates(self) -> Vec<FieldUpdate> {
        self.fields
            .into_iter()
            .map(|(field_id, value)| FieldUpdate { field_id, value })
            .collect()
    }
}
