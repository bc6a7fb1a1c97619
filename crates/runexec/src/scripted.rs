//! In-memory [`ExecutionClient`] that replays scripted replies.
//! （依照預先排定的回覆運作的記憶體內用戶端。）
//!
//! Every submitted request is recorded so callers can assert on the exact
//! payload that left the session.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::{ClientError, ExecutionClient, RunRequest, RunResponse};

/// One canned answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScriptedReply {
    Output(String),
    ErrorOutput(String),
    Unreachable,
}

impl ScriptedReply {
    pub fn output(text: impl Into<String>) -> Self {
        ScriptedReply::Output(text.into())
    }

    pub fn error(text: impl Into<String>) -> Self {
        ScriptedReply::ErrorOutput(text.into())
    }
}

#[derive(Debug, Default)]
pub struct ScriptedClient {
    replies: Mutex<VecDeque<ScriptedReply>>,
    fallback: Option<ScriptedReply>,
    submitted: Mutex<Vec<RunRequest>>,
    gate: Option<Semaphore>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = ScriptedReply>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Reply used once the scripted queue is exhausted (defaults to empty output).
    pub fn with_fallback(mut self, reply: ScriptedReply) -> Self {
        self.fallback = Some(reply);
        self
    }

    /// Holds every reply until [`release`](Self::release) hands out a permit.
    /// （在呼叫 `release` 之前暫停所有回覆。）
    pub fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    /// Lets `count` held submissions complete.
    pub fn release(&self, count: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(count);
        }
    }

    pub fn push_reply(&self, reply: ScriptedReply) {
        self.replies
            .lock()
            .expect("scripted replies poisoned")
            .push_back(reply);
    }

    /// Requests received so far, in submission order.
    pub fn submitted(&self) -> Vec<RunRequest> {
        self.submitted
            .lock()
            .expect("scripted submissions poisoned")
            .clone()
    }

    pub fn submission_count(&self) -> usize {
        self.submitted
            .lock()
            .expect("scripted submissions poisoned")
            .len()
    }

    fn next_reply(&self) -> ScriptedReply {
        self.replies
            .lock()
            .expect("scripted replies poisoned")
            .pop_front()
            .or_else(|| self.fallback.clone())
            .unwrap_or_else(|| ScriptedReply::Output(String::new()))
    }
}

#[async_trait]
impl ExecutionClient for ScriptedClient {
    async fn submit(&self, request: RunRequest) -> Result<RunResponse, ClientError> {
        self.submitted
            .lock()
            .expect("scripted submissions poisoned")
            .push(request);

        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|err| ClientError::Transport(err.to_string()))?;
            permit.forget();
        }

        match self.next_reply() {
            ScriptedReply::Output(text) => Ok(RunResponse::Output(text)),
            ScriptedReply::ErrorOutput(text) => Ok(RunResponse::ErrorOutput(text)),
            ScriptedReply::Unreachable => Err(ClientError::Transport(
                "scripted connection refused".to_string(),
            )),
        }
    }
}
