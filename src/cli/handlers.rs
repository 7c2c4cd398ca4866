use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::error;

use crate::ambient::Language;
use crate::config::Config;
use crate::entity::{format_timestamp, Note, NoteDraft};
use crate::error::{MageNoteError, Result, StoreErrorKind};
use crate::recovery::DeleteTarget;
use crate::service::{NoteService, Renderer};

/// Prints notices and store failures to stderr. Command output goes to
/// stdout, so refreshed collections are not echoed here.
pub struct ConsoleRenderer;

impl Renderer for ConsoleRenderer {
    fn on_collection_refreshed(&self, _notes: &[Note]) {}

    fn on_notice(&self, message: &str) {
        eprintln!("{}", message);
    }

    fn on_fatal_store_error(&self, kind: StoreErrorKind, detail: &str) {
        error!(%kind, detail, "note store unavailable");
    }
}

type Service = NoteService<ConsoleRenderer>;

async fn open_service(data_dir: Option<PathBuf>) -> Result<Service> {
    let data_dir = data_dir.unwrap_or_else(Config::default_data_dir);
    let config = Config::load(&data_dir)?;
    NoteService::start(config, Arc::new(ConsoleRenderer)).await
}

/// Open the service and fail unless the collection loaded.
async fn open_loaded(data_dir: Option<PathBuf>) -> Result<Service> {
    let service = open_service(data_dir).await?;
    service.ensure_ready().await?;
    Ok(service)
}

fn read_text(text: Option<String>, stdin: bool) -> Result<String> {
    if stdin {
        let mut content = String::new();
        io::stdin().read_to_string(&mut content)?;
        return Ok(content);
    }
    text.ok_or_else(|| MageNoteError::Config("Note text is required (or use --stdin)".to_string()))
}

/// Ask a y/N question on stdin. Refuses to guess when stdin is not a terminal.
fn confirm_interactively(prompt: &str) -> Result<bool> {
    eprintln!("{} [y/N] ", prompt);

    if !atty::is(atty::Stream::Stdin) {
        return Err(MageNoteError::Config(
            "Use --force to delete in non-interactive mode".to_string(),
        ));
    }

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

fn print_note(note: &Note) {
    println!("{}", note.header());
    println!("{}", note.body);
}

pub async fn handle_list(data_dir: Option<PathBuf>, json: bool) -> Result<()> {
    let service = open_loaded(data_dir).await?;
    let notes = service.notes().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&notes)?);
    } else if notes.is_empty() {
        println!("No notes found.");
    } else {
        for (i, note) in notes.iter().enumerate() {
            if i > 0 {
                println!();
            }
            print_note(note);
        }
    }

    Ok(())
}

pub async fn handle_show(data_dir: Option<PathBuf>, id: i64, json: bool) -> Result<()> {
    let service = open_loaded(data_dir).await?;
    let note = service
        .find(id)
        .await?
        .ok_or(MageNoteError::NoteNotFound(id))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&note)?);
    } else {
        print_note(&note);
    }

    Ok(())
}

pub async fn handle_add(data_dir: Option<PathBuf>, text: Option<String>, stdin: bool) -> Result<()> {
    let body = read_text(text, stdin)?;
    let service = open_loaded(data_dir).await?;

    let note = service.request_save(NoteDraft::create(body)).await?;
    println!("Created note #{} ({})", note.id, format_timestamp(&note.timestamp));

    Ok(())
}

pub async fn handle_edit(
    data_dir: Option<PathBuf>,
    id: i64,
    text: Option<String>,
    stdin: bool,
) -> Result<()> {
    let body = read_text(text, stdin)?;
    let service = open_loaded(data_dir).await?;

    if service.find(id).await?.is_none() {
        return Err(MageNoteError::NoteNotFound(id));
    }
    let note = service.request_save(NoteDraft::edit(id, body)).await?;
    println!("Updated note #{}", note.id);

    Ok(())
}

pub async fn handle_delete(data_dir: Option<PathBuf>, id: i64, force: bool) -> Result<()> {
    let service = open_loaded(data_dir).await?;
    service.request_delete(id).await?;

    if !force && !confirm_interactively("Continue?")? {
        service.cancel().await;
        println!("Cancelled.");
        return Ok(());
    }

    if let Some(DeleteTarget::Note(id)) = service.confirm().await? {
        println!("Deleted note #{}", id);
    }

    Ok(())
}

pub async fn handle_export(data_dir: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let service = open_loaded(data_dir).await?;
    let export = service.request_export().await?;

    let dir = match output {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    fs::create_dir_all(&dir)?;
    let path = dir.join(&export.file_name);
    fs::write(&path, &export.contents)?;

    println!("Exported notes to {}", path.display());
    Ok(())
}

pub async fn handle_import(data_dir: Option<PathBuf>, file: &Path) -> Result<()> {
    let document = fs::read_to_string(file)?;
    let service = open_loaded(data_dir).await?;

    let count = service.request_import(&document).await?;
    println!("Imported {} notes from {}", count, file.display());
    Ok(())
}

/// Unlike the other commands this runs against a store that failed to load.
pub async fn handle_reset(data_dir: Option<PathBuf>, force: bool) -> Result<()> {
    let service = open_service(data_dir).await?;

    if force {
        service.initialize_database().await?;
    } else {
        service.request_database_reset().await;
        if !confirm_interactively("Continue?")? {
            service.cancel().await;
            println!("Cancelled.");
            return Ok(());
        }
        service.confirm().await?;
    }

    service.ensure_ready().await?;
    println!("Database reset.");
    Ok(())
}

pub async fn handle_draft_show(data_dir: Option<PathBuf>) -> Result<()> {
    let service = open_service(data_dir).await?;
    match service.draft().await {
        Some(draft) => println!("{}", draft),
        None => println!("No draft."),
    }
    Ok(())
}

pub async fn handle_draft_set(data_dir: Option<PathBuf>, text: String) -> Result<()> {
    let service = open_service(data_dir).await?;
    service.draft_autosave().flush(&text).await?;
    println!("Draft saved.");
    Ok(())
}

pub async fn handle_draft_dictate(data_dir: Option<PathBuf>, transcript: String) -> Result<()> {
    let service = open_service(data_dir).await?;
    let draft = service.dictate(&transcript).await?;
    println!("{}", draft);
    Ok(())
}

pub async fn handle_draft_save(data_dir: Option<PathBuf>) -> Result<()> {
    let service = open_loaded(data_dir).await?;
    match service.save_draft().await? {
        Some(note) => println!("Created note #{} from draft", note.id),
        None => println!("Draft is empty, nothing saved."),
    }
    Ok(())
}

pub async fn handle_draft_clear(data_dir: Option<PathBuf>) -> Result<()> {
    let service = open_service(data_dir).await?;
    service.draft_autosave().discard().await?;
    println!("Draft cleared.");
    Ok(())
}

pub async fn handle_language(data_dir: Option<PathBuf>, name: Option<String>) -> Result<()> {
    let service = open_service(data_dir).await?;

    match name {
        Some(name) => {
            let language: Language = name.parse().map_err(MageNoteError::Config)?;
            service.set_language(language).await?;
            println!("Language set to {} ({})", language, language.tag());
        }
        None => {
            let language = service.language().await;
            println!("{} ({})", language, language.tag());
        }
    }

    Ok(())
}
