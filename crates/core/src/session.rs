use runpad_languages::{LanguageCatalog, LanguageId, LanguageProfile};
use runpad_runexec::{ClientError, RunRequest, RunResponse};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors raised by session operations.
/// （工作階段操作的錯誤。）
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("unknown language `{0}`")]
    UnknownLanguage(String),
}

/// Lifecycle of the most recent run. A new run always starts from a fresh value.
/// （最近一次執行的狀態；每次執行都從新值開始。）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Idle,
    Pending,
    Succeeded(String),
    Failed(String),
    Unreachable,
}

impl RunStatus {
    /// Whether a request is in flight.
    /// （是否仍有請求在等待回應。）
    pub fn is_pending(&self) -> bool {
        matches!(self, RunStatus::Pending)
    }

    /// Whether the run finished with a result the terminal can show.
    /// （執行是否已結束並產生結果。）
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Succeeded(_) | RunStatus::Failed(_) | RunStatus::Unreachable
        )
    }
}

/// What the execution client produced for one ticket.
/// （執行客戶端對單一票據的結果。）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(RunResponse),
    Unreachable,
}

impl From<Result<RunResponse, ClientError>> for RunOutcome {
    fn from(result: Result<RunResponse, ClientError>) -> Self {
        match result {
            Ok(response) => RunOutcome::Completed(response),
            Err(err) => {
                warn!(error = %err, "run did not reach the execution service");
                RunOutcome::Unreachable
            }
        }
    }
}

/// Snapshot of an accepted run, handed to whoever dispatches the request.
/// （已接受執行的快照，交由派送者送出請求。）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunTicket {
    generation: u64,
    language: LanguageId,
    language_label: String,
    request: RunRequest,
}

impl RunTicket {
    /// Run counter value when the ticket was issued.
    /// （發出票據時的執行代數。）
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Language active when the run started.
    /// （開始執行時的語言。）
    pub fn language(&self) -> &LanguageId {
        &self.language
    }

    /// Payload to submit.
    /// （要送出的請求內容。）
    pub fn request(&self) -> &RunRequest {
        &self.request
    }
}

/// Result of a language selection.
/// （選擇語言的結果。）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// Requested language was already active.
    Unchanged,
    /// The user kept their edits; nothing changed.
    Declined,
    Switched,
}

/// How a response for a superseded run is treated.
/// （過期執行的回應如何處理。）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StaleRunPolicy {
    /// Drop responses whose run was superseded by a language switch or a newer run.
    #[default]
    Discard,
    /// Apply every response on top of the current state (last write wins).
    Apply,
}

/// What [`Session::complete`] did with a response.
/// （`complete` 對回應的處理結果。）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionEffect {
    Applied(RunStatus),
    Discarded,
}

/// Yes/no decision supplied by the UI when a switch would drop user edits.
/// （切換會捨棄編輯時，由介面提供的確認決定。）
pub trait ConfirmSwitch {
    fn confirm_switch(&mut self, from: &LanguageProfile, to: &LanguageProfile) -> bool;
}

impl ConfirmSwitch for bool {
    fn confirm_switch(&mut self, _from: &LanguageProfile, _to: &LanguageProfile) -> bool {
        *self
    }
}

impl<F> ConfirmSwitch for F
where
    F: FnMut(&LanguageProfile, &LanguageProfile) -> bool,
{
    fn confirm_switch(&mut self, from: &LanguageProfile, to: &LanguageProfile) -> bool {
        self(from, to)
    }
}

/// Confirmation text shown before edits are discarded.
/// （捨棄編輯前顯示的確認訊息。）
pub const UNSAVED_CHANGES_PROMPT: &str =
    "You have unsaved changes. Switching languages will reset the editor. Continue?";

/// Line appended to the transcript when a run starts.
/// （開始執行時加入終端的訊息。）
pub fn initializing_banner(language: &LanguageProfile) -> String {
    format!("> Initializing {} runtime...\n", language.id)
}

/// Transcript for a run that reported error output.
/// （執行回報錯誤時的終端內容。）
pub fn failure_message(error_output: &str) -> String {
    format!("Error:\n{error_output}")
}

/// Transcript for a run that never reached the service.
/// （無法連線到執行服務時的終端內容。）
pub fn unreachable_message(language_label: &str) -> String {
    format!("> Error: {language_label} execution server unreachable.")
}

/// The single mutable record behind the editor surface.
/// （編輯器背後唯一的可變狀態。）
///
/// All mutation goes through the named operations below. Only [`run`](Self::run)
/// starts asynchronous work, and it does so by returning a [`RunTicket`] that the
/// caller dispatches and later feeds back through [`complete`](Self::complete).
#[derive(Debug, Clone)]
pub struct Session {
    catalog: LanguageCatalog,
    active: LanguageProfile,
    source: String,
    status: RunStatus,
    transcript: String,
    transcript_revision: u64,
    generation: u64,
    stale_policy: StaleRunPolicy,
}

impl Session {
    /// Starts on the catalog's first language with its template loaded.
    /// （以目錄中的第一個語言及其範本開始。）
    pub fn new(catalog: LanguageCatalog) -> Self {
        let active = catalog.first().clone();
        Self {
            source: active.default_source.clone(),
            catalog,
            active,
            status: RunStatus::Idle,
            transcript: String::new(),
            transcript_revision: 0,
            generation: 0,
            stale_policy: StaleRunPolicy::default(),
        }
    }

    /// Overrides how responses for superseded runs are handled.
    /// （設定過期回應的處理方式。）
    pub fn with_stale_policy(mut self, policy: StaleRunPolicy) -> Self {
        self.stale_policy = policy;
        self
    }

    /// Languages this session can switch between.
    /// （可切換的語言目錄。）
    pub fn catalog(&self) -> &LanguageCatalog {
        &self.catalog
    }

    /// Currently selected language.
    /// （目前選擇的語言。）
    pub fn active_language(&self) -> &LanguageProfile {
        &self.active
    }

    /// Buffered source text.
    /// （緩衝區中的原始碼。）
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Status of the latest run.
    /// （最近一次執行的狀態。）
    pub fn status(&self) -> &RunStatus {
        &self.status
    }

    /// Terminal text; empty means idle.
    /// （終端文字；空字串表示閒置。）
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    /// Bumped whenever the transcript text changes.
    /// （終端文字變更時遞增。）
    pub fn transcript_revision(&self) -> u64 {
        self.transcript_revision
    }

    /// Whether a run is in flight.
    /// （是否有執行正在等待。）
    pub fn is_pending(&self) -> bool {
        self.status.is_pending()
    }

    /// Policy for superseded responses.
    /// （過期回應的處理策略。）
    pub fn stale_policy(&self) -> StaleRunPolicy {
        self.stale_policy
    }

    /// Whether the buffer differs from the template. An empty buffer counts as unedited.
    /// （緩衝區是否與範本不同；空白緩衝區視為未編輯。）
    pub fn has_unsaved_edits(&self) -> bool {
        !self.source.is_empty() && !self.active.is_default_source(&self.source)
    }

    /// Whether switching to `id` would ask the user first.
    /// （切換至 `id` 是否需要先詢問使用者。）
    pub fn needs_confirmation(&self, id: &str) -> Result<bool, SessionError> {
        if self.active.id == id {
            return Ok(false);
        }
        self.resolve(id)?;
        Ok(self.has_unsaved_edits())
    }

    /// Switches to `id`, asking `confirm` first when edits would be lost.
    /// （切換至 `id`；會捨棄編輯時先詢問 `confirm`。）
    ///
    /// A completed switch resets the buffer to the new template, clears the
    /// transcript and supersedes any pending run.
    pub fn select_language(
        &mut self,
        id: &str,
        mut confirm: impl ConfirmSwitch,
    ) -> Result<SwitchOutcome, SessionError> {
        if self.active.id == id {
            return Ok(SwitchOutcome::Unchanged);
        }
        let target = self.resolve(id)?.clone();

        if self.has_unsaved_edits() && !confirm.confirm_switch(&self.active, &target) {
            debug!(from = %self.active.id, to = %target.id, "language switch declined");
            return Ok(SwitchOutcome::Declined);
        }

        if self.status.is_pending() {
            info!(
                generation = self.generation,
                "language switch supersedes pending run"
            );
        }
        // Any run still in flight now belongs to the previous language.
        self.generation += 1;
        self.set_transcript(String::new());
        self.status = RunStatus::Idle;
        self.source = target.default_source.clone();
        debug!(from = %self.active.id, to = %target.id, "language switched");
        self.active = target;
        Ok(SwitchOutcome::Switched)
    }

    /// Replaces the buffered source. Allowed in every status, including `Pending`.
    /// （取代緩衝區原始碼；任何狀態下皆可。）
    pub fn edit_source(&mut self, text: impl Into<String>) {
        self.source = text.into();
    }

    /// Starts a run unless one is already pending.
    /// （開始執行，除非已有執行在等待。）
    ///
    /// The returned ticket carries a snapshot of the source and service identifier;
    /// later edits do not reach the in-flight request.
    pub fn run(&mut self) -> Option<RunTicket> {
        if self.status.is_pending() {
            debug!(generation = self.generation, "run ignored: previous run pending");
            return None;
        }
        self.generation += 1;
        self.status = RunStatus::Pending;

        let mut transcript = std::mem::take(&mut self.transcript);
        if !transcript.is_empty() && !transcript.ends_with('\n') {
            transcript.push('\n');
        }
        transcript.push_str(&initializing_banner(&self.active));
        self.set_transcript(transcript);

        let ticket = RunTicket {
            generation: self.generation,
            language: self.active.id.clone(),
            language_label: self.active.display_label.clone(),
            request: RunRequest::new(self.source.clone(), self.active.service_identifier.clone()),
        };
        info!(
            generation = ticket.generation,
            language = %ticket.request.language,
            bytes = ticket.request.code.len(),
            "run dispatched"
        );
        Some(ticket)
    }

    /// Applies the result of `ticket`. The result message replaces the transcript.
    /// （套用票據的結果，並以結果訊息取代終端內容。）
    pub fn complete(&mut self, ticket: RunTicket, outcome: RunOutcome) -> CompletionEffect {
        if ticket.generation != self.generation {
            match self.stale_policy {
                StaleRunPolicy::Discard => {
                    warn!(
                        ticket = ticket.generation,
                        current = self.generation,
                        "discarding response for superseded run"
                    );
                    return CompletionEffect::Discarded;
                }
                StaleRunPolicy::Apply => {
                    warn!(
                        ticket = ticket.generation,
                        current = self.generation,
                        "applying response for superseded run"
                    );
                }
            }
        }

        let (status, message) = match outcome {
            RunOutcome::Completed(RunResponse::Output(output)) => {
                (RunStatus::Succeeded(output.clone()), output)
            }
            RunOutcome::Completed(RunResponse::ErrorOutput(error_output)) => {
                let message = failure_message(&error_output);
                (RunStatus::Failed(error_output), message)
            }
            RunOutcome::Unreachable => (
                RunStatus::Unreachable,
                unreachable_message(&ticket.language_label),
            ),
        };
        debug!(generation = ticket.generation, ?status, "run finished");
        self.status = status.clone();
        self.set_transcript(message);
        CompletionEffect::Applied(status)
    }

    /// Empties the transcript. A pending run keeps going.
    /// （清空終端；等待中的執行不受影響。）
    pub fn clear_output(&mut self) {
        self.set_transcript(String::new());
    }

    fn resolve(&self, id: &str) -> Result<&LanguageProfile, SessionError> {
        self.catalog
            .resolve(id)
            .map_err(|_| SessionError::UnknownLanguage(id.to_string()))
    }

    fn set_transcript(&mut self, text: String) {
        if self.transcript != text {
            self.transcript = text;
            self.transcript_revision += 1;
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(LanguageCatalog::builtin())
    }
}
