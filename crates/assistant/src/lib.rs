//! Assistant integration: a blocking chat-completions client plus the two
//! agents built on it: the guided hearing conversation and bulk import.

pub mod bulk;
pub mod client;
pub mod conversation;
pub mod prompt;
pub mod schema;

pub use client::{ChatClient, ClientError, Message, Role};
pub use conversation::{AgentError, ConversationAgent, TurnOutcome};
