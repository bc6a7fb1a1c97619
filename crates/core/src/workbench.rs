use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use runpad_runexec::ExecutionClient;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::editor::EditorAdapter;
use crate::session::{
    CompletionEffect, ConfirmSwitch, RunOutcome, RunTicket, Session, SessionError, SwitchOutcome,
};

/// Result of one finished run after it has been applied to the session.
/// （已套用至工作階段的執行結果。）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub generation: u64,
    pub effect: CompletionEffect,
}

/// Couples a [`Session`] with an editor widget and an execution client.
/// （結合工作階段、編輯器與執行客戶端。）
///
/// Session mutation stays on the caller's thread: spawned requests only send
/// their outcome back over a channel, and [`poll`](Self::poll) or
/// [`wait_for_completion`](Self::wait_for_completion) apply it.
pub struct Workbench<E> {
    session: Session,
    editor: E,
    client: Arc<dyn ExecutionClient>,
    runtime: Handle,
    completions_tx: UnboundedSender<(RunTicket, RunOutcome)>,
    completions_rx: UnboundedReceiver<(RunTicket, RunOutcome)>,
    outstanding: usize,
}

impl<E: EditorAdapter> Workbench<E> {
    /// The editor is loaded with the session's current source.
    /// （建立工作台並把目前原始碼載入編輯器。）
    pub fn new(
        session: Session,
        mut editor: E,
        client: Arc<dyn ExecutionClient>,
        runtime: Handle,
    ) -> Self {
        editor.set_value(session.source());
        let (completions_tx, completions_rx) = unbounded_channel();
        Self {
            session,
            editor,
            client,
            runtime,
            completions_tx,
            completions_rx,
            outstanding: 0,
        }
    }

    /// Read-only session state.
    /// （唯讀的工作階段狀態。）
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Read-only editor widget.
    /// （唯讀的編輯器。）
    pub fn editor(&self) -> &E {
        &self.editor
    }

    /// Mutable editor access that syncs the session on drop.
    /// （可變的編輯器存取；放開時同步至工作階段。）
    pub fn editor_mut(&mut self) -> EditorGuard<'_, E> {
        EditorGuard {
            editor: &mut self.editor,
            session: &mut self.session,
        }
    }

    /// Replaces the buffer in both editor and session.
    /// （以新文字取代緩衝區，編輯器與工作階段同步更新。）
    pub fn edit_source(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.editor.set_value(&text);
        self.session.edit_source(text);
    }

    /// Requests dispatched but not yet applied.
    /// （已送出但尚未套用的請求數。）
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Pulls the latest user edit from the editor into the session.
    /// （把編輯器中尚未同步的修改寫入工作階段。）
    pub fn sync_editor(&mut self) {
        pull_change(&mut self.editor, &mut self.session);
    }

    /// Whether switching to `id` would discard edits, after syncing the editor.
    /// （切換語言是否需要確認。）
    pub fn needs_confirmation(&mut self, id: &str) -> Result<bool, SessionError> {
        self.sync_editor();
        self.session.needs_confirmation(id)
    }

    /// Switches language and loads the new template into the editor.
    /// （切換語言；成功時編輯器載入新範本。）
    pub fn select_language(
        &mut self,
        id: &str,
        confirm: impl ConfirmSwitch,
    ) -> Result<SwitchOutcome, SessionError> {
        self.sync_editor();
        let outcome = self.session.select_language(id, confirm)?;
        if outcome == SwitchOutcome::Switched {
            self.editor.set_value(self.session.source());
        }
        Ok(outcome)
    }

    /// Starts a run; returns `false` when a previous run is still pending.
    /// （開始執行；若前一次仍在等待則回傳 `false`。）
    pub fn run(&mut self) -> bool {
        self.sync_editor();
        let Some(ticket) = self.session.run() else {
            return false;
        };

        let client = Arc::clone(&self.client);
        let sender = self.completions_tx.clone();
        let request = ticket.request().clone();
        self.outstanding += 1;
        self.runtime.spawn(async move {
            let outcome = RunOutcome::from(client.submit(request).await);
            // The receiver lives as long as the workbench; a send error means it was dropped.
            let _ = sender.send((ticket, outcome));
        });
        true
    }

    /// Empties the terminal transcript.
    /// （清除終端輸出。）
    pub fn clear_output(&mut self) {
        self.session.clear_output();
    }

    /// Applies every completion that has already arrived, without blocking.
    /// （套用所有已抵達的結果，不會阻塞。）
    pub fn poll(&mut self) -> Vec<Completion> {
        let mut applied = Vec::new();
        while let Ok((ticket, outcome)) = self.completions_rx.try_recv() {
            applied.push(self.apply(ticket, outcome));
        }
        applied
    }

    /// Waits for the next completion. Returns `None` when nothing is outstanding.
    /// （等待下一個結果；沒有進行中的請求時回傳 `None`。）
    pub async fn wait_for_completion(&mut self) -> Option<Completion> {
        if self.outstanding == 0 {
            return None;
        }
        let (ticket, outcome) = self.completions_rx.recv().await?;
        Some(self.apply(ticket, outcome))
    }

    /// Waits until every dispatched request has been applied.
    /// （等待所有請求都已套用。）
    pub async fn settle(&mut self) -> Vec<Completion> {
        let mut applied = Vec::new();
        while let Some(completion) = self.wait_for_completion().await {
            applied.push(completion);
        }
        applied
    }

    fn apply(&mut self, ticket: RunTicket, outcome: RunOutcome) -> Completion {
        self.outstanding = self.outstanding.saturating_sub(1);
        let generation = ticket.generation();
        let effect = self.session.complete(ticket, outcome);
        debug!(generation, ?effect, outstanding = self.outstanding, "completion applied");
        Completion { generation, effect }
    }
}

/// Mutable editor borrow that pushes edits into the session when dropped.
/// （編輯器的可變借用，放開時把修改推入工作階段。）
pub struct EditorGuard<'a, E: EditorAdapter> {
    editor: &'a mut E,
    session: &'a mut Session,
}

impl<E: EditorAdapter> Deref for EditorGuard<'_, E> {
    type Target = E;

    fn deref(&self) -> &E {
        &*self.editor
    }
}

impl<E: EditorAdapter> DerefMut for EditorGuard<'_, E> {
    fn deref_mut(&mut self) -> &mut E {
        &mut *self.editor
    }
}

impl<E: EditorAdapter> Drop for EditorGuard<'_, E> {
    fn drop(&mut self) {
        pull_change(&mut *self.editor, &mut *self.session);
    }
}

fn pull_change<E: EditorAdapter>(editor: &mut E, session: &mut Session) {
    if let Some(text) = editor.take_change() {
        session.edit_source(text);
    }
}
