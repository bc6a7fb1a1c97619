/// Boundary between the text-editing widget and the session.
/// （編輯器元件與工作階段之間的介面。）
///
/// The widget reports user edits through [`take_change`](EditorAdapter::take_change);
/// the session pushes template resets back through [`set_value`](EditorAdapter::set_value).
pub trait EditorAdapter {
    /// Current widget contents.
    /// （目前編輯器中的文字。）
    fn value(&self) -> &str;

    /// Replaces the contents without raising a change.
    /// （以程式方式取代內容，不視為使用者編輯。）
    fn set_value(&mut self, text: &str);

    /// Drains the pending user edit, if any.
    /// （取出尚未同步的使用者編輯（若有）。）
    fn take_change(&mut self) -> Option<String>;
}

/// In-memory adapter used by the CLI and tests.
/// （記憶體內的編輯緩衝區，供 CLI 與測試使用。）
#[derive(Debug, Clone, Default)]
pub struct TextBuffer {
    contents: String,
    revision: u64,
    changed: bool,
}

impl TextBuffer {
    /// Creates a buffer holding `text`.
    /// （以初始文字建立緩衝區。）
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            contents: text.into(),
            revision: 0,
            changed: false,
        }
    }

    /// Simulates a user edit replacing the whole buffer.
    /// （模擬使用者輸入：取代全部內容並標記為已變更。）
    pub fn edit(&mut self, text: impl Into<String>) {
        self.contents = text.into();
        self.revision += 1;
        self.changed = true;
    }

    /// Appends a line typed by the user.
    /// （在結尾附加一行。）
    pub fn push_line(&mut self, line: &str) {
        if !self.contents.is_empty() && !self.contents.ends_with('\n') {
            self.contents.push('\n');
        }
        self.contents.push_str(line);
        self.revision += 1;
        self.changed = true;
    }

    /// Incremented on every content change.
    /// （每次內容變動都會遞增。）
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn has_pending_change(&self) -> bool {
        self.changed
    }
}

impl EditorAdapter for TextBuffer {
    fn value(&self) -> &str {
        &self.contents
    }

    fn set_value(&mut self, text: &str) {
        if self.contents != text {
            self.contents = text.to_string();
            self.revision += 1;
        }
        self.changed = false;
    }

    fn take_change(&mut self) -> Option<String> {
        if std::mem::take(&mut self.changed) {
            Some(self.contents.clone())
        } else {
            None
        }
    }
}
