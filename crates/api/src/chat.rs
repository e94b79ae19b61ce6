//! Polling chat client for project messages.
//!
//! The backend has no push transport; messages are fetched on a fixed
//! interval. The poller is an explicit task tied to its handle's
//! lifetime: stopping the handle (or dropping it) cancels the task, so
//! a closed view can never keep polling in the background.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;

use operis_core::domain::message::{ChatMessage, MessageType};
use operis_core::domain::project::ProjectId;

use crate::client::ApiClient;
use crate::endpoints::projects;
use crate::error::ApiError;

const DEFAULT_HISTORY_LIMIT: u32 = 100;

pub struct ChatPoller {
    client: ApiClient,
    project: ProjectId,
    interval: Duration,
    history_limit: u32,
}

impl ChatPoller {
    pub fn new(client: ApiClient, project: ProjectId, interval: Duration) -> Self {
        Self { client, project, interval, history_limit: DEFAULT_HISTORY_LIMIT }
    }

    pub fn with_history_limit(mut self, limit: u32) -> Self {
        self.history_limit = limit;
        self
    }

    /// Start polling. The first fetch happens immediately; afterwards
    /// the task ticks on the configured interval and also re-polls when
    /// poked after a send. Poll failures are logged and retried on the
    /// next tick.
    pub fn spawn(self) -> ChatHandle {
        let (snapshot_tx, snapshot_rx) = watch::channel(Vec::new());
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let poke = Arc::new(Notify::new());

        let client = self.client.clone();
        let project = self.project;
        let limit = self.history_limit;
        let interval = self.interval;
        let task_poke = Arc::clone(&poke);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = task_poke.notified() => {}
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                        continue;
                    }
                }

                match projects::list_messages(&client, project, Some(limit)).await {
                    Ok(messages) => {
                        // Send failure only means every receiver is gone.
                        if snapshot_tx.send(messages).is_err() {
                            break;
                        }
                    }
                    Err(error) => {
                        tracing::warn!(%project, %error, "chat poll failed; will retry");
                        if error.requires_login() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!(%project, "chat poller stopped");
        });

        ChatHandle {
            client: self.client,
            project,
            messages: snapshot_rx,
            shutdown: shutdown_tx,
            poke,
            task: Some(task),
        }
    }
}

pub struct ChatHandle {
    client: ApiClient,
    project: ProjectId,
    messages: watch::Receiver<Vec<ChatMessage>>,
    shutdown: watch::Sender<bool>,
    poke: Arc<Notify>,
    task: Option<JoinHandle<()>>,
}

impl ChatHandle {
    /// Live view of the latest message snapshot.
    pub fn messages(&self) -> watch::Receiver<Vec<ChatMessage>> {
        self.messages.clone()
    }

    /// Send a message, then force an immediate re-poll so the sender
    /// sees their own message without waiting a full interval.
    pub async fn send(&self, message: &str) -> Result<ChatMessage, ApiError> {
        let sent =
            projects::send_message(&self.client, self.project, message, MessageType::Text).await?;
        self.poke.notify_one();
        Ok(sent)
    }

    /// Stop polling and wait for the task to wind down.
    pub async fn stop(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for ChatHandle {
    fn drop(&mut self) {
        // A dropped handle must never leave a background task polling.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
