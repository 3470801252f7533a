//! Bulk import: fill many fields at once from pasted text and attached
//! files instead of a turn-by-turn hearing.
//!
//! The whole import is one undo step. Field ids the model invents are
//! dropped by the binder without aborting the rest of the batch.

use bridgesheet_engine::binder::UpdateReport;
use bridgesheet_engine::session::SheetSession;

use crate::client::{ChatClient, ClientError, Message};
use crate::conversation::AgentError;
use crate::prompt::{self, Attachment};
use crate::schema::{self, BulkInputResponse};

pub struct BulkImportAgent {
    client: ChatClient,
}

impl BulkImportAgent {
    pub fn new(client: ChatClient) -> Self {
        Self { client }
    }

    /// Extract field values from the given material and apply them.
    pub fn run(
        &self,
        session: &mut SheetSession,
        attachments: &[Attachment],
        text_input: &str,
        instructions: &str,
    ) -> Result<UpdateReport, AgentError> {
        let prompt = prompt::bulk_input(session.document(), attachments, text_input, instructions);
        let content = self
            .client
            .complete(&[Message::user(prompt)], &schema::bulk_input_result())?;
        let parsed: BulkInputResponse = serde_json::from_str(&content)
            .map_err(|e| AgentError::Client(ClientError::Parse(e.to_string())))?;

        let updates = parsed.into_updates();
        Ok(session.apply_bulk_fields(&updates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridgesheet_config::Settings;
    use bridgesheet_engine::binder::SkipReason;
    use bridgesheet_engine::events::SheetEvent;
    use httpmock::prelude::*;

    const SPEC: &str = r#"{"sheet-content": [
        {"id": "A", "parent": "root", "level": 1, "type": "nonterminal", "name": "授業情報", "form": {"prior": 1}},
        {"id": "A-01", "parent": "A", "level": 2, "type": "terminal", "name": "学年", "form": {"prior": 1}},
        {"id": "A-02", "parent": "A", "level": 2, "type": "terminal", "name": "冊数", "form": {}}
    ]}"#;

    fn agent_for(server: &MockServer) -> BulkImportAgent {
        let mut settings = Settings::default();
        settings.endpoint = server.base_url();
        settings.api_key = "test-key".into();
        BulkImportAgent::new(ChatClient::from_settings(&settings).unwrap())
    }

    fn answer(session: &SheetSession, code: &str) -> String {
        let doc = session.document();
        let handle = doc.find_by_code(code).unwrap();
        doc.node(handle).unwrap().kind.form().unwrap().answer.clone()
    }

    #[test]
    fn test_import_fills_fields_in_one_snapshot() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .json_body_partial(
                    r#"{"response_format": {"json_schema": {"name": "bulk_input_result"}}}"#,
                );
            then.status(200).json_body(serde_json::json!({
                "choices": [{"message": {"content":
                    "{\"fields\": {\"A-01\": \"3年生\", \"A-02\": \"20冊\", \"Z-99\": \"dropped\"}}"
                }}]
            }));
        });

        let mut session = SheetSession::load(SPEC).unwrap();
        session.drain_events();
        let agent = agent_for(&server);

        let report = agent
            .run(&mut session, &[Attachment::text("plan.txt", "3年生、20冊")], "", "")
            .unwrap();
        mock.assert();

        assert_eq!(report.applied, vec!["A-01", "A-02"]);
        assert_eq!(report.skipped, vec![("Z-99".to_string(), SkipReason::UnknownField)]);
        assert_eq!(answer(&session, "A-01"), "3年生");
        assert_eq!(answer(&session, "A-02"), "20冊");

        let captures = session
            .drain_events()
            .iter()
            .filter(|e| matches!(e, SheetEvent::SnapshotCaptured))
            .count();
        assert_eq!(captures, 1);

        // One undo removes the whole import.
        session.undo().unwrap();
        assert_eq!(answer(&session, "A-01"), "");
    }

    #[test]
    fn test_non_contract_content_is_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200).json_body(serde_json::json!({
                "choices": [{"message": {"content": "できませんでした"}}]
            }));
        });

        let mut session = SheetSession::load(SPEC).unwrap();
        let agent = agent_for(&server);
        let err = agent.run(&mut session, &[], "text", "").unwrap_err();
        assert!(matches!(err, AgentError::Client(ClientError::Parse(_))));
        // Sheet untouched.
        assert_eq!(answer(&session, "A-01"), "");
        assert!(!session.can_undo());
    }

    #[test]
    fn test_http_error_propagates() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(401).body("bad key");
        });

        let mut session = SheetSession::load(SPEC).unwrap();
        let agent = agent_for(&server);
        let err = agent.run(&mut session, &[], "x", "").unwrap_err();
        assert!(matches!(err, AgentError::Client(ClientError::Http(401, _))));
    }
}
