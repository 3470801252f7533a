// bsheet - headless hearing-sheet operations
// Edits BRIDGE sheet files and runs the hearing assistant from a terminal.

mod assist_cmds;
mod exit_codes;
mod sheet_cmds;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use bridgesheet_engine::document::NodeType;
use bridgesheet_engine::node::ControlKind;

use exit_codes::{EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "bsheet")]
#[command(about = "Hearing sheet editor and assistant (headless)")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that a sheet file parses and its tree is well-formed
    Validate {
        /// Sheet file (spec JSON)
        file: PathBuf,
    },

    /// Print a sheet as an indented tree or as canonical JSON
    #[command(after_help = "\
Examples:
  bsheet show sheet.json
  bsheet show sheet.json --format json > canonical.json")]
    Show {
        file: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = ShowFormat::Tree)]
        format: ShowFormat,
    },

    /// Write a field's answer through its form control
    #[command(after_help = "\
Examples:
  bsheet set sheet.json A-01 '3年生'
  bsheet set sheet.json A-02 '調べ学習／その他'
  bsheet set sheet.json A-02 '俳句づくり' --sub")]
    Set {
        file: PathBuf,

        /// Field id, e.g. A-01
        id: String,

        value: String,

        /// Write the sub-control ("other") text instead of the main answer
        #[arg(long)]
        sub: bool,
    },

    /// Add a new item under a parent, as its first child
    Add {
        file: PathBuf,

        /// Parent item id
        parent: String,
    },

    /// Delete an item and its whole subtree
    Delete {
        file: PathBuf,

        /// Item id
        id: String,

        /// Skip the confirmation (required in scripts)
        #[arg(long)]
        yes: bool,
    },

    /// Move an item under a new parent and/or to a new sibling position
    #[command(after_help = "\
Examples:
  bsheet move sheet.json A-02 --index 0
  bsheet move sheet.json A-02 --parent B
  bsheet move sheet.json B --index 0          # make B the first top-level item")]
    Move {
        file: PathBuf,

        /// Item id
        id: String,

        /// New parent id (omit for top level)
        #[arg(long)]
        parent: Option<String>,

        /// Position among the new siblings
        #[arg(long, default_value_t = 0)]
        index: usize,
    },

    /// Edit an item's name, type, or form settings
    #[command(after_help = "\
Examples:
  bsheet edit sheet.json A-01 --name '対象学年'
  bsheet edit sheet.json A-02 --control radio --options '公共図書館／学校図書館'
  bsheet edit sheet.json B --type terminal")]
    Edit {
        file: PathBuf,

        /// Item id
        id: String,

        /// Display name
        #[arg(long)]
        name: Option<String>,

        /// Item type; switching rebuilds the form payload
        #[arg(long = "type", value_enum)]
        node_type: Option<NodeTypeArg>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        example: Option<String>,

        /// Form control
        #[arg(long, value_enum)]
        control: Option<ControlArg>,

        /// Choice list, joined with ／
        #[arg(long)]
        options: Option<String>,

        #[arg(long)]
        importance: Option<u8>,

        /// Priority flag (1 = ask about this field first)
        #[arg(long)]
        prior: Option<u8>,
    },

    /// Blank every answer on the sheet
    Clear {
        file: PathBuf,

        /// Skip the confirmation (required in scripts)
        #[arg(long)]
        yes: bool,
    },

    /// Interactive hearing conversation (reads turns from stdin)
    #[command(after_help = "\
Examples:
  bsheet chat sheet.json
  bsheet chat sheet.json --init --transcript chat.json")]
    Chat {
        file: PathBuf,

        /// Generate an opening question from the current sheet state
        #[arg(long)]
        init: bool,

        /// Save the conversation transcript here on exit
        #[arg(long)]
        transcript: Option<PathBuf>,
    },

    /// Fill many fields at once from pasted text and attached files
    #[command(after_help = "\
Examples:
  bsheet bulk sheet.json --text '3年生、国語、20冊ほど'
  bsheet bulk sheet.json --attach plan.txt --attach flyer.png
  bsheet bulk sheet.json --attach notes.md --instructions '冊数は半角数字で'")]
    Bulk {
        file: PathBuf,

        /// Free text to extract field values from
        #[arg(long)]
        text: Option<String>,

        /// File to attach (repeatable); images are referenced by name only
        #[arg(long = "attach", value_name = "FILE")]
        attachments: Vec<PathBuf>,

        /// Extra instructions for the extraction
        #[arg(long)]
        instructions: Option<String>,
    },

    /// Show or change assistant connection settings
    #[command(after_help = "\
Examples:
  bsheet config
  bsheet config --path
  bsheet config --set-endpoint https://example.openai.azure.com/openai/v1
  bsheet config --set-key sk-...")]
    Config {
        /// Print the settings file path and exit
        #[arg(long)]
        path: bool,

        #[arg(long, value_name = "URL")]
        set_endpoint: Option<String>,

        #[arg(long, value_name = "KEY")]
        set_key: Option<String>,

        #[arg(long, value_name = "MODEL")]
        set_model: Option<String>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ShowFormat {
    Tree,
    Json,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum NodeTypeArg {
    Terminal,
    Nonterminal,
}

impl From<NodeTypeArg> for NodeType {
    fn from(arg: NodeTypeArg) -> Self {
        match arg {
            NodeTypeArg::Terminal => NodeType::Terminal,
            NodeTypeArg::Nonterminal => NodeType::Nonterminal,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ControlArg {
    Input,
    Textarea,
    Select,
    Checkbox,
    Radio,
}

impl From<ControlArg> for ControlKind {
    fn from(arg: ControlArg) -> Self {
        match arg {
            ControlArg::Input => ControlKind::Input,
            ControlArg::Textarea => ControlKind::Textarea,
            ControlArg::Select => ControlKind::Select,
            ControlArg::Checkbox => ControlKind::Checkbox,
            ControlArg::Radio => ControlKind::Radio,
        }
    }
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  bridgesheet-engine ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  bridgesheet-engine ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { file } => sheet_cmds::cmd_validate(&file),
        Commands::Show { file, format } => sheet_cmds::cmd_show(&file, format),
        Commands::Set { file, id, value, sub } => sheet_cmds::cmd_set(&file, &id, &value, sub),
        Commands::Add { file, parent } => sheet_cmds::cmd_add(&file, &parent),
        Commands::Delete { file, id, yes } => sheet_cmds::cmd_delete(&file, &id, yes),
        Commands::Move { file, id, parent, index } => {
            sheet_cmds::cmd_move(&file, &id, parent.as_deref(), index)
        }
        Commands::Edit {
            file,
            id,
            name,
            node_type,
            description,
            example,
            control,
            options,
            importance,
            prior,
        } => sheet_cmds::cmd_edit(
            &file,
            &id,
            bridgesheet_engine::editor::MetaPatch {
                name,
                node_type: node_type.map(Into::into),
                description,
                example,
                control: control.map(Into::into),
                options,
                importance,
                prior,
            },
        ),
        Commands::Clear { file, yes } => sheet_cmds::cmd_clear(&file, yes),
        Commands::Chat { file, init, transcript } => {
            assist_cmds::cmd_chat(&file, init, transcript.as_deref())
        }
        Commands::Bulk { file, text, attachments, instructions } => assist_cmds::cmd_bulk(
            &file,
            text.as_deref().unwrap_or(""),
            &attachments,
            instructions.as_deref().unwrap_or(""),
        ),
        Commands::Config { path, set_endpoint, set_key, set_model } => {
            assist_cmds::cmd_config(path, set_endpoint, set_key, set_model)
        }
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
