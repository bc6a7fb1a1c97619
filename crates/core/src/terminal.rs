use crate::session::Session;

/// Shown when the transcript is empty.
/// （終端為空時顯示的提示字元。）
pub const IDLE_PROMPT: &str = "system@runpad:~$";

/// Passive renderer for the session transcript.
/// （工作階段終端內容的被動呈現器。）
///
/// Keeps only viewport bookkeeping: whenever the transcript revision moves, the
/// view snaps back to the newest line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalView {
    viewport_rows: usize,
    scroll_offset: usize,
    seen_revision: Option<u64>,
}

impl TerminalView {
    /// Creates a view with at least one visible row.
    /// （建立至少有一列可見的檢視。）
    pub fn new(viewport_rows: usize) -> Self {
        Self {
            viewport_rows: viewport_rows.max(1),
            scroll_offset: 0,
            seen_revision: None,
        }
    }

    /// Text to display: the transcript, or the idle prompt when it is empty.
    /// （要顯示的文字：終端內容，或空白時的提示字元。）
    pub fn render<'a>(&self, session: &'a Session) -> &'a str {
        render_transcript(session.transcript())
    }

    /// Re-pins the viewport to the bottom if the transcript changed since the last call.
    /// Returns `true` when a scroll happened.
    /// （終端內容變更時捲動到底部；有捲動時回傳 `true`。）
    pub fn sync(&mut self, session: &Session) -> bool {
        let revision = session.transcript_revision();
        if self.seen_revision == Some(revision) {
            return false;
        }
        self.seen_revision = Some(revision);
        self.scroll_to_bottom(session);
        true
    }

    /// Applies a new viewport height, keeping the newest line visible.
    /// （套用新的檢視高度，並保持最新一列可見。）
    pub fn resize(&mut self, viewport_rows: usize, session: &Session) {
        self.viewport_rows = viewport_rows.max(1);
        self.scroll_to_bottom(session);
    }

    /// Clear trigger wired to the terminal's Clear button.
    /// （終端「清除」按鈕的動作。）
    pub fn clear(&mut self, session: &mut Session) {
        session.clear_output();
        self.sync(session);
    }

    pub fn viewport_rows(&self) -> usize {
        self.viewport_rows
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    /// Lines currently inside the viewport.
    /// （目前檢視範圍內的各列。）
    pub fn visible_lines<'a>(&self, session: &'a Session) -> Vec<&'a str> {
        self.render(session)
            .lines()
            .skip(self.scroll_offset)
            .take(self.viewport_rows)
            .collect()
    }

    fn scroll_to_bottom(&mut self, session: &Session) {
        let total = line_count(self.render(session));
        self.scroll_offset = total.saturating_sub(self.viewport_rows);
    }
}

impl Default for TerminalView {
    fn default() -> Self {
        Self::new(24)
    }
}

/// Maps an empty transcript to [`IDLE_PROMPT`].
/// （空白終端內容對應到提示字元。）
pub fn render_transcript(transcript: &str) -> &str {
    if transcript.is_empty() {
        IDLE_PROMPT
    } else {
        transcript
    }
}

fn line_count(text: &str) -> usize {
    text.lines().count().max(1)
}
