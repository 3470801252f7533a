// Chat transcript export/import
//
// Assistant turns are stored verbatim, which for structured turns means the
// raw JSON payload the model returned. Display helpers re-parse that payload
// and degrade to the raw text when it is not the expected shape.

use std::fmt;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into(), timestamp: Utc::now() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into(), timestamp: Utc::now() }
    }

    /// Human-readable text of this turn. Structured assistant payloads
    /// (`{"message": …, "updates": […]}`) render as their message; anything
    /// else renders verbatim.
    pub fn display_text(&self) -> String {
        if self.role == Role::Assistant {
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(&self.content) {
                if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
                    return message.to_string();
                }
            }
        }
        self.content.clone()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug)]
pub enum TranscriptError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl fmt::Display for TranscriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranscriptError::Io(e) => write!(f, "{}", e),
            TranscriptError::Parse(e) => write!(f, "transcript parse error: {}", e),
        }
    }
}

impl std::error::Error for TranscriptError {}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn save(&self, path: &Path) -> Result<(), TranscriptError> {
        let json = serde_json::to_string_pretty(self).map_err(TranscriptError::Parse)?;
        fs::write(path, json).map_err(TranscriptError::Io)
    }

    pub fn load(path: &Path) -> Result<Self, TranscriptError> {
        let contents = fs::read_to_string(path).map_err(TranscriptError::Io)?;
        serde_json::from_str(&contents).map_err(TranscriptError::Parse)
    }

    /// Plain-text rendering, one line header per turn.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for message in &self.messages {
            let who = match message.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            out.push_str(&format!(
                "[{}] {}\n{}\n\n",
                message.timestamp.to_rfc3339(),
                who,
                message.display_text()
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chat.json");

        let mut transcript = Transcript::new();
        transcript.push(ChatMessage::user("来週の授業について"));
        transcript.push(ChatMessage::assistant(
            r#"{"message": "何年生向けですか？", "updates": []}"#,
        ));
        transcript.save(&path).unwrap();

        let reloaded = Transcript::load(&path).unwrap();
        assert_eq!(transcript, reloaded);
    }

    #[test]
    fn test_structured_assistant_turn_displays_message() {
        let message = ChatMessage::assistant(
            r#"{"message": "登録しました", "updates": [{"field_id": "A-01", "value": "3年生"}]}"#,
        );
        assert_eq!(message.display_text(), "登録しました");
    }

    #[test]
    fn test_unstructured_assistant_turn_displays_verbatim() {
        let message = ChatMessage::assistant("plain reply, not JSON");
        assert_eq!(message.display_text(), "plain reply, not JSON");
    }

    #[test]
    fn test_user_turn_never_reparsed() {
        let message = ChatMessage::user(r#"{"message": "not an assistant turn"}"#);
        assert_eq!(message.display_text(), r#"{"message": "not an assistant turn"}"#);
    }

    #[test]
    fn test_timestamps_serialize_as_rfc3339() {
        let message = ChatMessage::user("hi");
        let json = serde_json::to_value(&message).unwrap();
        let raw = json["timestamp"].as_str().unwrap();
        assert!(raw.parse::<DateTime<Utc>>().is_ok());
    }
}
