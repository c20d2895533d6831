//! Command-line front end for idempotent XML edits.
//!
//! Prints one JSON object on stdout: the outcome on success (exit 0) or the
//! failure on error (exit 1). Logs go to stderr. Usage errors are reported
//! by clap (exit 2).

use std::fs;
use std::io::{self, IsTerminal as _};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

use xmledit::codec::XmlCodec;
use xmledit::edit::{BlockCheck, EditOptions, EditRequest, Editor, Operation, Outcome, State};
use xmledit::parser::ParseOptions;
use xmledit::serial::SerializeOptions;
use xmledit::EditError;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// xmledit -- bring an element or attribute of an XML file into a given state.
///
/// Running the same command twice changes the file at most once.
#[derive(Parser, Debug)]
#[command(name = "xmledit", version, about, long_about = None)]
struct Cli {
    /// XML file to edit.
    #[arg(long, value_name = "FILE", required_unless_present = "args")]
    path: Option<PathBuf>,

    /// Path expression addressing the element or attribute.
    #[arg(long, required_unless_present = "args")]
    xpath: Option<String>,

    /// Requested state: present, absent, addblock, or rename (aliases:
    /// upsert, delete, insert-raw).
    #[arg(long, required_unless_present = "args")]
    state: Option<State>,

    /// Text or attribute value, raw XML block, or new name.
    #[arg(long)]
    value: Option<String>,

    /// Read path, xpath, state, and value from a JSON file instead.
    #[arg(long, value_name = "FILE", conflicts_with_all = ["path", "xpath", "state", "value"])]
    args: Option<PathBuf>,

    /// Report what would change without writing the file.
    #[arg(long)]
    check: bool,

    /// How addblock detects a block that is already present.
    #[arg(long, value_name = "MODE", default_value_t = BlockCheck::Literal)]
    block_check: BlockCheck,

    /// String used per indentation level when saving.
    #[arg(long, value_name = "STRING", default_value = "  ")]
    indent: String,

    /// Maximum element nesting depth accepted when loading.
    #[arg(long, value_name = "N")]
    max_depth: Option<u32>,

    /// Log each step to stderr.
    #[arg(short, long)]
    verbose: bool,
}

/// Contents of an `--args` file.
#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct ArgsFile {
    path: PathBuf,
    xpath: String,
    state: State,
    #[serde(default)]
    value: Option<String>,
}

#[derive(Serialize)]
struct Failure<'a> {
    failed: bool,
    error_kind: &'a str,
    message: String,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(outcome) => print_json(&outcome, ExitCode::SUCCESS),
        Err(err) => {
            let failure = Failure {
                failed: true,
                error_kind: err.kind().as_str(),
                message: err.to_string(),
            };
            print_json(&failure, ExitCode::FAILURE)
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default.into())
        .from_env_lossy();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_ansi(io::stderr().is_terminal())
        .try_init();
}

fn run(cli: &Cli) -> Result<Outcome, EditError> {
    let request = build_request(cli)?;

    let mut parse_options = ParseOptions::default();
    if let Some(depth) = cli.max_depth {
        parse_options = parse_options.max_depth(depth);
    }
    let serialize_options = SerializeOptions::default()
        .indent(true)
        .indent_str(&cli.indent);
    let options = EditOptions::default()
        .check_mode(cli.check)
        .block_check(cli.block_check);

    Editor::with_codec(XmlCodec::new(parse_options, serialize_options))
        .options(options)
        .run(&request)
}

fn build_request(cli: &Cli) -> Result<EditRequest, EditError> {
    if let Some(args_path) = &cli.args {
        let text = fs::read_to_string(args_path).map_err(|source| EditError::Io {
            path: args_path.clone(),
            source,
        })?;
        let args: ArgsFile = serde_json::from_str(&text).map_err(|err| {
            EditError::InvalidOperation(format!("{}: {err}", args_path.display()))
        })?;
        let operation = Operation::from_state(args.state, args.value)?;
        return Ok(EditRequest::new(args.path, args.xpath, operation));
    }

    // clap guarantees these are present when --args is absent.
    let (Some(path), Some(xpath), Some(state)) = (&cli.path, &cli.xpath, cli.state) else {
        return Err(EditError::InvalidOperation(
            "--path, --xpath and --state are required".to_string(),
        ));
    };
    let operation = Operation::from_state(state, cli.value.clone())?;
    Ok(EditRequest::new(path.clone(), xpath.clone(), operation))
}

fn print_json<T: Serialize>(value: &T, code: ExitCode) -> ExitCode {
    match serde_json::to_string(value) {
        Ok(json) => {
            println!("{json}");
            code
        }
        Err(err) => {
            eprintln!("failed to encode result: {err}");
            ExitCode::FAILURE
        }
    }
}
