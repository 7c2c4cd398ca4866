use clap::Parser;
use magenote::cli::{
    handle_add, handle_delete, handle_draft_clear, handle_draft_dictate, handle_draft_save,
    handle_draft_set, handle_draft_show, handle_edit, handle_export, handle_import,
    handle_language, handle_list, handle_reset, handle_show, Cli, Commands, DraftAction,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Stdout carries command output, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let data_dir = cli.data_dir;

    let result = match cli.command {
        Commands::List { json } => handle_list(data_dir, json).await,
        Commands::Show { id, json } => handle_show(data_dir, id, json).await,
        Commands::Add { text, stdin } => handle_add(data_dir, text, stdin).await,
        Commands::Edit { id, text, stdin } => handle_edit(data_dir, id, text, stdin).await,
        Commands::Delete { id, force } => handle_delete(data_dir, id, force).await,
        Commands::Export { output } => handle_export(data_dir, output).await,
        Commands::Import { file } => handle_import(data_dir, &file).await,
        Commands::Reset { force } => handle_reset(data_dir, force).await,
        Commands::Draft(draft) => match draft.action {
            DraftAction::Show => handle_draft_show(data_dir).await,
            DraftAction::Set { text } => handle_draft_set(data_dir, text).await,
            DraftAction::Dictate { transcript } => handle_draft_dictate(data_dir, transcript).await,
            DraftAction::Save => handle_draft_save(data_dir).await,
            DraftAction::Clear => handle_draft_clear(data_dir).await,
        },
        Commands::Language { name } => handle_language(data_dir, name).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
