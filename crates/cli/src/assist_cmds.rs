// Assistant commands: the interactive hearing chat, bulk import, and
// connection settings.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;

use bridgesheet_assistant::bulk::BulkImportAgent;
use bridgesheet_assistant::{AgentError, ChatClient, ClientError, ConversationAgent};
use bridgesheet_assistant::prompt::Attachment;
use bridgesheet_config::Settings;
use bridgesheet_engine::binder::{SkipReason, UpdateReport};
use bridgesheet_engine::session::SheetSession;
use bridgesheet_io::sheet_file;
use bridgesheet_io::transcript::{ChatMessage, Transcript};

use crate::exit_codes::EXIT_ASSISTANT_NOT_CONFIGURED;
use crate::CliError;

fn client_error(e: ClientError) -> CliError {
    match e {
        ClientError::NotConfigured(e) => CliError {
            code: EXIT_ASSISTANT_NOT_CONFIGURED,
            message: e.to_string(),
            hint: Some("run `bsheet config --set-endpoint ... --set-key ...`".to_string()),
        },
        other => CliError::error(other.to_string()),
    }
}

fn agent_error(e: AgentError) -> CliError {
    match e {
        AgentError::Client(e) => client_error(e),
        AgentError::Busy => CliError::error(e.to_string()),
    }
}

fn connect() -> Result<ChatClient, CliError> {
    ChatClient::from_settings(&Settings::load()).map_err(client_error)
}

fn load_session(path: &Path) -> Result<SheetSession, CliError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| CliError::usage(format!("cannot read {}: {}", path.display(), e)))?;
    SheetSession::load(&contents)
        .map_err(|e| CliError::usage(format!("{}: {}", path.display(), e)))
}

fn describe_skip(reason: &SkipReason) -> &'static str {
    match reason {
        SkipReason::UnknownField => "unknown field",
        SkipReason::NotAField => "not a field",
        SkipReason::NoMatchingOption => "no matching option",
    }
}

fn print_report(report: &UpdateReport) {
    if !report.applied.is_empty() {
        println!("updated: {}", report.applied.join(", "));
    }
    for (id, reason) in &report.skipped {
        println!("skipped: {} ({})", id, describe_skip(reason));
    }
}

pub fn cmd_chat(path: &Path, init: bool, transcript_path: Option<&Path>) -> Result<(), CliError> {
    let client = connect()?;
    let mut session = load_session(path)?;
    let mut agent = ConversationAgent::new(client);
    let mut transcript = Transcript::new();

    println!("{}", ConversationAgent::greeting());
    transcript.push(ChatMessage::assistant(ConversationAgent::greeting()));
    if init {
        let question = agent.initial_question(session.document());
        println!("{}", question);
        transcript.push(ChatMessage::assistant(question));
    }

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.map_err(|e| CliError::error(format!("stdin: {}", e)))?;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        transcript.push(ChatMessage::user(text));
        match agent.ask(&mut session, text) {
            Ok(outcome) => {
                println!("{}", outcome.message);
                print_report(&outcome.report);
                // Keep the raw contract payload so replays see the writes.
                if let Some(turn) = agent.history().last() {
                    transcript.push(ChatMessage::assistant(turn.content.clone()));
                }
            }
            Err(e) => {
                eprintln!("error: {}", agent_error(e).message);
            }
        }
        print!("> ");
        io::stdout().flush().ok();
    }

    sheet_file::save(session.document(), path)
        .map_err(|e| CliError::error(format!("cannot write {}: {}", path.display(), e)))?;
    println!("saved {}", path.display());

    if let Some(out) = transcript_path {
        if !transcript.is_empty() {
            transcript
                .save(out)
                .map_err(|e| CliError::error(format!("cannot write {}: {}", out.display(), e)))?;
            println!("transcript saved to {}", out.display());
        }
    }
    Ok(())
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

fn attachment_from_path(path: &Path) -> Result<Attachment, CliError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        // Image contents never leave the machine; only the name is cited.
        if !path.exists() {
            return Err(CliError::usage(format!("cannot read {}: not found", path.display())));
        }
        return Ok(Attachment::image(name));
    }
    let contents = fs::read_to_string(path)
        .map_err(|e| CliError::usage(format!("cannot read {}: {}", path.display(), e)))?;
    Ok(Attachment::text(name, contents))
}

pub fn cmd_bulk(
    path: &Path,
    text: &str,
    attachment_paths: &[std::path::PathBuf],
    instructions: &str,
) -> Result<(), CliError> {
    if text.is_empty() && attachment_paths.is_empty() {
        return Err(CliError::usage("nothing to import")
            .with_hint("pass --text and/or one or more --attach files"));
    }
    let client = connect()?;
    let mut session = load_session(path)?;
    let attachments = attachment_paths
        .iter()
        .map(|p| attachment_from_path(p))
        .collect::<Result<Vec<_>, _>>()?;

    let agent = BulkImportAgent::new(client);
    let report = agent
        .run(&mut session, &attachments, text, instructions)
        .map_err(agent_error)?;
    print_report(&report);
    if report.applied.is_empty() {
        println!("no fields filled");
    }

    sheet_file::save(session.document(), path)
        .map_err(|e| CliError::error(format!("cannot write {}: {}", path.display(), e)))?;
    Ok(())
}

fn render_settings(settings: &Settings) -> String {
    let endpoint = if settings.endpoint.is_empty() { "(not set)" } else { &settings.endpoint };
    let key = if settings.effective_api_key().is_empty() { "(not set)" } else { "(set)" };
    format!(
        "endpoint:   {}\n\
         api key:    {}\n\
         model:      {}\n\
         reasoning:  {}\n\
         verbosity:  {}\n\
         settings:   {}",
        endpoint,
        key,
        settings.model,
        settings.reasoning_effort.as_str(),
        settings.verbosity.as_str(),
        Settings::config_path_display(),
    )
}

pub fn cmd_config(
    path: bool,
    set_endpoint: Option<String>,
    set_key: Option<String>,
    set_model: Option<String>,
) -> Result<(), CliError> {
    if path {
        println!("{}", Settings::config_path_display());
        return Ok(());
    }

    let mut settings = Settings::load();
    let changing = set_endpoint.is_some() || set_key.is_some() || set_model.is_some();
    if let Some(endpoint) = set_endpoint {
        settings.endpoint = endpoint;
    }
    if let Some(key) = set_key {
        settings.api_key = key;
    }
    if let Some(model) = set_model {
        settings.model = model;
    }
    if changing {
        settings.save().map_err(|e| CliError::error(e.to_string()))?;
        println!("saved {}", Settings::config_path_display());
        return Ok(());
    }

    println!("{}", render_settings(&settings));
    Ok(())
}
