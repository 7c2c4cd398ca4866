use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "magenote")]
#[command(version, about = "Local notes with backups you can take with you")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding the note database and settings
    #[arg(long, global = true, env = "MAGENOTE_DATA_DIR", value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List notes, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a single note
    Show {
        /// Note id
        id: i64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a new note
    Add {
        /// Note text
        text: Option<String>,

        /// Read the note text from stdin
        #[arg(long, conflicts_with = "text")]
        stdin: bool,
    },

    /// Replace the text of an existing note
    Edit {
        /// Note id
        id: i64,

        /// New note text
        text: Option<String>,

        /// Read the new text from stdin
        #[arg(long, conflicts_with = "text")]
        stdin: bool,
    },

    /// Delete a note
    Delete {
        /// Note id
        id: i64,

        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Write a backup file of every note
    Export {
        /// Directory to write the backup into (defaults to the current directory)
        #[arg(long, short = 'o', value_name = "DIR")]
        output: Option<PathBuf>,
    },

    /// Restore notes from a backup file
    Import {
        /// Backup file to read
        file: PathBuf,
    },

    /// Delete the database and every note in it
    Reset {
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Work with the unsaved draft
    Draft(DraftCommand),

    /// Show or set the dictation language
    Language {
        /// Language name (e.g. "english")
        name: Option<String>,
    },
}

#[derive(Args, Debug)]
pub struct DraftCommand {
    #[command(subcommand)]
    pub action: DraftAction,
}

#[derive(Subcommand, Debug)]
pub enum DraftAction {
    /// Print the current draft
    Show,

    /// Replace the draft text
    Set {
        /// Draft text
        text: String,
    },

    /// Append a dictated transcript to the draft
    Dictate {
        /// Transcript text
        transcript: String,
    },

    /// Save the draft as a new note and clear it
    Save,

    /// Throw the draft away
    Clear,
}
