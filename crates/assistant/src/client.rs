//! Chat-completions HTTP client.
//!
//! Blocking reqwest client (no Tokio runtime required). Every call goes to
//! `{endpoint}/chat/completions` with the Azure-style `api-version` query
//! and `api-key` header, and pins the response shape with a strict
//! `json_schema` response format.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use bridgesheet_config::{ConfigError, Settings};

use crate::schema::ResponseContract;

pub const API_VERSION: &str = "2024-12-01-preview";

/// Error type for assistant calls.
#[derive(Debug)]
pub enum ClientError {
    /// Endpoint or key missing
    NotConfigured(ConfigError),
    /// Network error
    Network(String),
    /// HTTP error with status code
    Http(u16, String),
    /// Response body did not have the expected shape
    Parse(String),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::NotConfigured(e) => write!(f, "{}", e),
            ClientError::Network(msg) => write!(f, "Network error: {}", msg),
            ClientError::Http(code, msg) => write!(f, "HTTP {}: {}", code, msg),
            ClientError::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One chat turn on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Assistant API client (blocking).
#[derive(Clone, Debug)]
pub struct ChatClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
    model: String,
    reasoning_effort: String,
    verbosity: String,
}

impl ChatClient {
    /// Create a client from validated settings. Fails up front when the
    /// endpoint or key is missing rather than on the first call.
    pub fn from_settings(settings: &Settings) -> Result<Self, ClientError> {
        settings.validate().map_err(ClientError::NotConfigured)?;

        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("bsheet/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");

        Ok(Self {
            http,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            api_key: settings.effective_api_key(),
            model: settings.model.clone(),
            reasoning_effort: settings.reasoning_effort.as_str().to_string(),
            verbosity: settings.verbosity.as_str().to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run one completion and return the raw message content. The contract
    /// constrains the model's output to a named JSON schema; the content
    /// string still has to be parsed by the caller (and may not conform if
    /// the server ignored the contract).
    pub fn complete(
        &self,
        messages: &[Message],
        contract: &ResponseContract,
    ) -> Result<String, ClientError> {
        let url = format!("{}/chat/completions", self.endpoint);
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "reasoning_effort": self.reasoning_effort,
            "verbosity": self.verbosity,
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": contract.name,
                    "strict": true,
                    "schema": contract.schema,
                },
            },
        });

        let response = self
            .http
            .post(&url)
            .query(&[("api-version", API_VERSION)])
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ClientError::Http(status, body));
        }

        let json: serde_json::Value =
            response.json().map_err(|e| ClientError::Parse(e.to_string()))?;
        json["choices"][0]["message"]["content"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| ClientError::Parse("missing choices[0].message.content".into()))
    }
}
