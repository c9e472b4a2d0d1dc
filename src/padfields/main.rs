use clap::Parser;
use colored::*;
use directories::ProjectDirs;
use padfields::clipboard::{copy_to_clipboard, SystemClipboard};
use padfields::codec::{self, Segment};
use padfields::config::FieldsConfig;
use padfields::context::{DepthLimit, SnippetLookup};
use padfields::error::{FieldsError, Result};
use padfields::fields::FieldKind;
use padfields::model::Note;
use padfields::store::fs::FileNoteStore;
use padfields::store::NoteStore;
use padfields::{DynamicValueConfig, Engine, ExpansionContext, FormField, ProcessingMode};
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod args;
mod print;
use args::{Cli, Commands, NotesAction};
use print::Problem;

const HOME_ENV: &str = "PADFIELDS_HOME";
const LOG_ENV: &str = "PADFIELDS_LOG";

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

struct AppContext {
    dir: PathBuf,
    config: FieldsConfig,
    store: FileNoteStore,
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let mut ctx = init_context(&cli)?;

    match cli.command {
        Commands::Expand {
            input,
            mode,
            set,
            max_depth,
            copy,
        } => handle_expand(&ctx, &input, mode, &set, max_depth, copy),
        Commands::Fields { input } => handle_fields(&ctx, &input),
        Commands::Check { input } => handle_check(&ctx, &input),
        Commands::Notes { action } => handle_notes(&mut ctx, action),
        Commands::Config { key, value } => handle_config(&mut ctx, key, value),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn init_context(cli: &Cli) -> Result<AppContext> {
    let dir = match cli
        .dir
        .clone()
        .or_else(|| std::env::var_os(HOME_ENV).map(PathBuf::from))
    {
        Some(dir) => dir,
        None => ProjectDirs::from("com", "padfields", "padfields")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| FieldsError::Api("Could not determine data dir".into()))?,
    };
    let config = FieldsConfig::load(&dir)?;
    let store = FileNoteStore::new(&dir);
    Ok(AppContext { dir, config, store })
}

fn build_engine(ctx: &AppContext, max_depth: Option<usize>) -> Engine {
    let depth = max_depth.unwrap_or(ctx.config.max_recursion_depth);
    let context = ExpansionContext::new()
        .with_snippets(FileNoteStore::new(&ctx.dir))
        .with_clipboard(SystemClipboard)
        .with_limits(DepthLimit(depth))
        .with_date_format(ctx.config.date_format.clone());
    Engine::with_context(context)
}

/// A file path, "-" for stdin, or "@<note-id>".
fn read_input(ctx: &AppContext, input: &str) -> Result<String> {
    if input == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(FieldsError::Io)?;
        return Ok(text);
    }
    if let Some(id) = input.strip_prefix('@') {
        return Ok(ctx.store.get_note(id)?.content);
    }
    std::fs::read_to_string(input).map_err(FieldsError::Io)
}

fn handle_expand(
    ctx: &AppContext,
    input: &str,
    mode: ProcessingMode,
    assignments: &[String],
    max_depth: Option<usize>,
    copy: bool,
) -> Result<()> {
    let text = read_input(ctx, input)?;
    let engine = build_engine(ctx, max_depth);

    let mut config = DynamicValueConfig::new(mode);
    if !assignments.is_empty() {
        let mut fields = engine.form_fields(&text, &config);
        for assignment in assignments {
            apply_assignment(&mut fields, assignment)?;
        }
        config = config.with_initial_fields(fields.into_iter().map(|f| f.field).collect());
    }

    let output = engine.process(&text, &config);
    print::print_expanded(&output);

    if copy {
        match copy_to_clipboard(&output) {
            Ok(()) => eprintln!("{}", "Copied to clipboard.".dimmed()),
            Err(e) => eprintln!("Warning: Failed to copy to clipboard: {}", e),
        }
    }
    Ok(())
}

/// Applies `KEY=VALUE`, where KEY is a field id, label, or 1-based position.
fn apply_assignment(fields: &mut [FormField], assignment: &str) -> Result<()> {
    let (key, value) = assignment
        .split_once('=')
        .ok_or_else(|| FieldsError::Api(format!("Expected KEY=VALUE, got '{}'", assignment)))?;

    let position = fields
        .iter()
        .position(|f| {
            let meta = f.field.meta();
            meta.id.as_deref() == Some(key) || meta.label.as_deref() == Some(key)
        })
        .or_else(|| {
            key.parse::<usize>()
                .ok()
                .filter(|n| (1..=fields.len()).contains(n))
                .map(|n| n - 1)
        })
        .ok_or_else(|| FieldsError::Api(format!("No field matches '{}'", key)))?;

    fields[position].field.set_input(value)
}

fn handle_fields(ctx: &AppContext, input: &str) -> Result<()> {
    let text = read_input(ctx, input)?;
    let engine = build_engine(ctx, None);
    let config = DynamicValueConfig::new(ProcessingMode::FastAction);

    let mut fields = engine.form_fields(&text, &config);
    engine.render(&text, &mut fields, &config);

    let rc = padfields::engine::ResolveContext::new(&engine, &config);
    let listed: Vec<(FormField, Option<String>)> = fields
        .into_iter()
        .map(|mut form_field| {
            let value = form_field.field.resolve(&rc);
            (form_field, value)
        })
        .collect();
    print::print_fields(&listed);
    Ok(())
}

fn handle_check(ctx: &AppContext, input: &str) -> Result<()> {
    let text = read_input(ctx, input)?;
    let engine = build_engine(ctx, None);
    let snippets = &ctx.store;

    let mut problems = Vec::new();
    let placeholders = codec::parse(&text)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Placeholder(spec) => Some(spec),
            Segment::Literal(_) => None,
        });

    for (index, spec) in placeholders.enumerate() {
        let field = engine.registry().create(&spec, engine.context());
        let reason = if spec.is_malformed() && field.is_unknown() {
            Some("malformed placeholder".to_string())
        } else if field.is_unknown() && engine.registry().get(spec.type_id()).is_some() {
            Some("invalid attributes".to_string())
        } else if field.is_unknown() {
            Some(format!("unknown type '{}'", spec.type_id()))
        } else {
            match field.kind() {
                FieldKind::Snippet(snippet) => missing_note(snippets, &snippet.snippet_id)?,
                FieldKind::Legacy(legacy) => match legacy.argument() {
                    Some(id) => missing_note(snippets, id)?,
                    None => None,
                },
                FieldKind::Text(text_field) => text_field.check().map(|v| format!("value too long ({})", v)),
                FieldKind::Number(number) => number.check().map(|v| format!("value out of range ({})", v)),
                _ => None,
            }
        };

        if let Some(reason) = reason {
            problems.push(Problem {
                index,
                placeholder: spec.source().to_string(),
                reason,
            });
        }
    }

    print::print_problems(&problems);
    if problems.is_empty() {
        Ok(())
    } else {
        Err(FieldsError::Api(format!(
            "{} placeholder(s) need attention",
            problems.len()
        )))
    }
}

fn missing_note(snippets: &impl SnippetLookup, id: &str) -> Result<Option<String>> {
    Ok(snippets
        .find_by_id(id)?
        .is_none()
        .then(|| format!("note '{}' not found", id)))
}

fn handle_notes(ctx: &mut AppContext, action: NotesAction) -> Result<()> {
    match action {
        NotesAction::Add {
            title,
            content,
            id,
            raw,
        } => {
            if title.trim().is_empty() {
                return Err(FieldsError::Api("Title cannot be empty".into()));
            }
            let content = match content {
                Some(content) => content,
                None => {
                    let mut text = String::new();
                    std::io::stdin()
                        .read_to_string(&mut text)
                        .map_err(FieldsError::Io)?;
                    text
                }
            };
            let mut note = match id {
                Some(id) => Note::with_id(id, title, content),
                None => Note::new(title, content),
            };
            note.metadata.expand_allowed = !raw;
            ctx.store.save_note(&note)?;
            println!("{} {}", "Saved note".green(), note.id());
        }
        NotesAction::List => {
            let notes = ctx.store.list_notes()?;
            print::print_notes(&notes);
        }
    }
    Ok(())
}

fn handle_config(ctx: &mut AppContext, key: Option<String>, value: Option<String>) -> Result<()> {
    match (key, value) {
        (None, _) => print::print_config(&ctx.config),
        (Some(key), None) => match ctx.config.get(&key) {
            Some(value) => println!("{} = {}", key, value),
            None => return Err(FieldsError::Api(format!("Unknown config key: {}", key))),
        },
        (Some(key), Some(value)) => {
            ctx.config.set(&key, &value)?;
            ctx.config.save(&ctx.dir)?;
            println!("{} {} = {}", "Set".green(), key, value);
        }
    }
    Ok(())
}
