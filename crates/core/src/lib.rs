pub mod editor;
pub mod session;
pub mod terminal;
pub mod workbench;

pub use editor::{EditorAdapter, TextBuffer};
pub use session::{
    CompletionEffect, ConfirmSwitch, RunOutcome, RunStatus, RunTicket, Session, SessionError,
    StaleRunPolicy, SwitchOutcome, UNSAVED_CHANGES_PROMPT,
};
pub use terminal::{TerminalView, IDLE_PROMPT};
pub use workbench::{Completion, EditorGuard, Workbench};

pub use runpad_languages::{LanguageCatalog, LanguageId, LanguageProfile};
pub use runpad_runexec::{ExecutionClient, RunRequest, RunResponse};
