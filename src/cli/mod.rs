mod commands;
mod handlers;

pub use commands::{Cli, Commands, DraftAction, DraftCommand};
pub use handlers::{
    handle_add, handle_delete, handle_draft_clear, handle_draft_dictate, handle_draft_save,
    handle_draft_set, handle_draft_show, handle_edit, handle_export, handle_import,
    handle_language, handle_list, handle_reset, handle_show, ConsoleRenderer,
};
