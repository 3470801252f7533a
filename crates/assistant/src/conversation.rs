//! Guided hearing conversation.
//!
//! One agent per sheet session: it keeps the chat history, asks the model
//! for the next turn under the `sheet_update` contract, and applies any
//! returned field writes through the session (one undo step per turn).
//!
//! A turn whose content is not valid contract JSON degrades to a plain
//! text reply with no writes; question generation degrades to a canned
//! question. Neither failure mode loses the conversation.

use bridgesheet_engine::session::SheetSession;
use bridgesheet_engine::binder::UpdateReport;
use bridgesheet_engine::document::SheetDocument;

use crate::client::{ChatClient, ClientError, Message};
use crate::prompt::{self, SheetAnalysis};
use crate::schema::{self, InitialQuestionResponse, SheetUpdateResponse};

#[derive(Debug)]
pub enum AgentError {
    /// A turn is already in flight.
    Busy,
    Client(ClientError),
}

impl std::fmt::Display for AgentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentError::Busy => write!(f, "a request is already in progress"),
            AgentError::Client(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for AgentError {}

impl From<ClientError> for AgentError {
    fn from(e: ClientError) -> Self {
        AgentError::Client(e)
    }
}

/// Result of one conversation turn.
#[derive(Debug)]
pub struct TurnOutcome {
    /// Reply text to show the user.
    pub message: String,
    /// What the turn's updates did to the sheet.
    pub report: UpdateReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AgentState {
    Idle,
    AwaitingModelResponse,
}

pub struct ConversationAgent {
    client: ChatClient,
    history: Vec<Message>,
    state: AgentState,
}

impl ConversationAgent {
    pub fn new(client: ChatClient) -> Self {
        Self { client, history: Vec::new(), state: AgentState::Idle }
    }

    /// Opening line shown before the first generated question.
    pub fn greeting() -> &'static str {
        prompt::GREETING
    }

    pub fn is_busy(&self) -> bool {
        self.state == AgentState::AwaitingModelResponse
    }

    /// Chat turns so far (user turns verbatim, assistant turns as their raw
    /// contract JSON), for transcript export.
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Restore a previously exported chat history.
    pub fn restore_history(&mut self, history: Vec<Message>) {
        self.history = history;
    }

    /// Generate the opening question for the current sheet state. Falls
    /// back to a canned question if the model cannot be reached.
    pub fn initial_question(&mut self, doc: &SheetDocument) -> String {
        let analysis = prompt::analyze(doc);
        let question = match self.generate_question(&analysis) {
            Ok(question) => question,
            Err(e) => {
                log::warn!("failed to generate initial question: {}", e);
                prompt::FALLBACK_FIRST_QUESTION.to_string()
            }
        };
        self.record_assistant_message(&question);
        question
    }

    /// Generate a follow-up question after the sheet changed outside the
    /// conversation. Falls back to asking about the first unfilled
    /// priority field.
    pub fn follow_up_question(&mut self, doc: &SheetDocument) -> String {
        let analysis = prompt::analyze(doc);
        let question = match self.generate_question(&analysis) {
            Ok(question) => question,
            Err(e) => {
                log::warn!("failed to generate follow-up question: {}", e);
                prompt::fallback_question(&analysis)
            }
        };
        self.record_assistant_message(&question);
        question
    }

    fn generate_question(&self, analysis: &SheetAnalysis) -> Result<String, ClientError> {
        let messages = [
            Message::system(prompt::initial_question_system(analysis)),
            Message::user("最初の質問を生成してください。"),
        ];
        let content = self.client.complete(&messages, &schema::initial_question())?;
        let parsed: InitialQuestionResponse =
            serde_json::from_str(&content).map_err(|e| ClientError::Parse(e.to_string()))?;
        Ok(parsed.message)
    }

    fn record_assistant_message(&mut self, message: &str) {
        let content = serde_json::json!({"message": message, "updates": []}).to_string();
        self.history.push(Message::assistant(content));
    }

    /// Run one conversation turn: send the user's message with the full
    /// history, apply any returned updates, and return the reply.
    pub fn ask(
        &mut self,
        session: &mut SheetSession,
        user_text: &str,
    ) -> Result<TurnOutcome, AgentError> {
        if self.is_busy() {
            return Err(AgentError::Busy);
        }

        let mut messages = vec![Message::system(prompt::conversation_system(session.document()))];
        messages.extend(self.history.iter().cloned());
        messages.push(Message::user(user_text));
        self.history.push(Message::user(user_text));

        self.state = AgentState::AwaitingModelResponse;
        let result = self.client.complete(&messages, &schema::sheet_update());
        self.state = AgentState::Idle;
        let content = result?;

        let (message, updates) = match serde_json::from_str::<SheetUpdateResponse>(&content) {
            Ok(parsed) => (parsed.message, parsed.updates),
            Err(e) => {
                // Content did not honor the contract; show it verbatim.
                log::warn!("assistant reply is not contract JSON: {}", e);
                (content.clone(), Vec::new())
            }
        };

        let report = session.apply_field_updates(&updates);
        self.history.push(Message::assistant(content));
        Ok(TurnOutcome { message, report })
    }

    #[cfg(test)]
    pub(crate) fn force_busy(&mut self) {
        self.state = AgentState::AwaitingModelResponse;
    }
}
