//! Request submission for a front end.
//!
//! A [`Session`] holds everything a request needs (client, host, model) and
//! runs each submitted request as its own task on a tokio runtime. Results
//! reach the front end through one update queue, tagged by [`TaskId`].

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use oml_core::api::{ChatRequest, Endpoint, PullRequest};
use oml_core::{ChannelSink, DecodeMode, DecodeOutcome, EventSink, OmlError, TaskId, Update};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::ollama::{Decoder, OllamaClient, OllamaConfig, Reply};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskKind {
    Chat,
    Pull,
}

/// A submitted request. Dropping the handle leaves the task running.
#[derive(Debug)]
pub struct TaskHandle {
    id: TaskId,
    kind: TaskKind,
    join: JoinHandle<Result<DecodeOutcome, OmlError>>,
}

impl TaskHandle {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    pub async fn join(self) -> Result<DecodeOutcome, OmlError> {
        self.join
            .await
            .map_err(|e| OmlError::Task(e.to_string()))?
    }
}

pub struct Session {
    client: OllamaClient,
    updates: UnboundedSender<Update>,
    runtime: Handle,
    next_id: AtomicU64,
}

impl Session {
    pub fn new(client: OllamaClient, updates: UnboundedSender<Update>, runtime: Handle) -> Self {
        Self {
            client,
            updates,
            runtime,
            next_id: AtomicU64::new(1),
        }
    }

    /// Build a session and the receiving end of its update queue.
    pub fn with_channel(
        cfg: OllamaConfig,
        runtime: Handle,
    ) -> anyhow::Result<(Self, UnboundedReceiver<Update>)> {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = OllamaClient::new(cfg)?;
        Ok((Self::new(client, tx, runtime), rx))
    }

    pub fn host(&self) -> &str {
        self.client.host()
    }

    /// Requests already submitted keep the host they started with.
    pub fn set_host(&mut self, host: &str) {
        self.client.set_host(host);
        info!(target: "providers::session", "host set to {}", self.client.host());
    }

    pub fn model(&self) -> &str {
        &self.client.config().model
    }

    pub fn models(&self) -> &[String] {
        &self.client.config().models
    }

    /// Make `name` the chat model and pull it.
    pub fn select_model(&mut self, name: &str) -> TaskHandle {
        self.client.config_mut().model = name.trim().to_string();
        info!(target: "providers::session", "model set to {}", self.model());
        self.submit_pull(name)
    }

    /// Returns false for blank or already listed names.
    pub fn add_model(&mut self, name: &str) -> bool {
        let name = name.trim();
        let models = &mut self.client.config_mut().models;
        if name.is_empty() || models.iter().any(|m| m == name) {
            return false;
        }
        models.push(name.to_string());
        true
    }

    pub fn remove_model(&mut self, name: &str) -> bool {
        let models = &mut self.client.config_mut().models;
        let before = models.len();
        models.retain(|m| m != name.trim());
        models.len() != before
    }

    /// Send `text` as a single user message to the current model.
    pub fn submit_chat(&self, text: &str) -> TaskHandle {
        let req = ChatRequest::user(self.model(), text);
        info!(target: "providers::session", "submit chat: model={} input_len={} chars", req.model, text.chars().count());
        let client = self.client.clone();
        self.spawn(TaskKind::Chat, DecodeMode::Chat, async move {
            client.open(Endpoint::Chat, &req).await
        })
    }

    pub fn submit_pull(&self, model: &str) -> TaskHandle {
        let req = PullRequest::new(model.trim());
        info!(target: "providers::session", "submit pull: model={}", req.model_name);
        let client = self.client.clone();
        self.spawn(TaskKind::Pull, DecodeMode::Raw, async move {
            client.open(Endpoint::Pull, &req).await
        })
    }

    fn spawn<F>(&self, kind: TaskKind, mode: DecodeMode, open: F) -> TaskHandle
    where
        F: Future<Output = Result<Reply, OmlError>> + Send + 'static,
    {
        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let sink = ChannelSink::new(id, self.updates.clone());
        let decoder = Decoder::new(mode).max_line_bytes(self.client.config().max_line_bytes);
        let join = self.runtime.spawn(async move {
            let result = match open.await {
                Ok(reply) => decoder.http_status(reply.status).decode(reply.body, &sink).await,
                Err(e) => Err(e),
            };
            match &result {
                Ok(outcome) => {
                    info!(target: "providers::session", "task {} finished: {:?}", id, outcome)
                }
                Err(e) => {
                    error!(target: "providers::session", "task {} failed: {}", id, e);
                    sink.fail(e);
                }
            }
            result
        });
        TaskHandle { id, kind, join }
    }
}
