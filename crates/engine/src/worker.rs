//! Single-worker request loop around one open spellbook.
//!
//! UI events are queued on an mpsc channel and handled one at a time, so a
//! toggle never races a save. Render requests queued behind each other are
//! merged and the view is published once on a watch channel.

use spellbook_shared::{Action, RenderRequest, SpellbookView};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::use_cases::commit::CommitReport;
use crate::use_cases::spellbook::{SpellbookError, SpellbookState};

const REQUEST_BUFFER: usize = 64;

/// Requests handled by the worker.
pub enum SpellbookRequest {
    Render(RenderRequest),
    Dispatch {
        action: Action,
        reply: oneshot::Sender<Result<RenderRequest, SpellbookError>>,
    },
    Commit {
        reply: oneshot::Sender<Result<CommitReport, SpellbookError>>,
    },
}

/// A published view and the parts that changed since the previous one.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub version: u64,
    pub render: RenderRequest,
    pub view: SpellbookView,
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Spellbook worker stopped")]
    Closed,
    #[error(transparent)]
    Spellbook(#[from] SpellbookError),
}

/// Owns the spellbook state and serves requests serially.
pub struct SpellbookWorker {
    state: SpellbookState,
    requests: mpsc::Receiver<SpellbookRequest>,
    views: watch::Sender<Rendered>,
    version: u64,
}

impl SpellbookWorker {
    /// Start the worker on the current runtime. The initial view is
    /// published before this returns.
    pub fn spawn(state: SpellbookState) -> (SpellbookHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(REQUEST_BUFFER);
        let (views_tx, views_rx) = watch::channel(Rendered {
            version: 0,
            render: RenderRequest::full(),
            view: state.view(),
        });
        let worker = SpellbookWorker {
            state,
            requests: rx,
            views: views_tx,
            version: 0,
        };
        let task = tokio::spawn(worker.run());
        (
            SpellbookHandle {
                requests: tx,
                views: views_rx,
            },
            task,
        )
    }

    async fn run(mut self) {
        let actor_id = self.state.actor_id().clone();
        tracing::debug!(actor_id = %actor_id, "Spellbook worker started");

        let mut queued: Option<RenderRequest> = None;
        loop {
            let next = if queued.is_some() {
                self.requests.try_recv().ok()
            } else {
                match self.requests.recv().await {
                    Some(request) => Some(request),
                    None => break,
                }
            };

            match next {
                Some(request) => {
                    if let Some(render) = self.handle(request).await {
                        queued = Some(match queued.take() {
                            Some(earlier) => earlier.merge(render),
                            None => render,
                        });
                    }
                }
                // Queue drained
                None => {
                    if let Some(render) = queued.take() {
                        self.publish(render);
                    }
                }
            }
        }
        tracing::debug!(actor_id = %actor_id, "Spellbook worker stopped");
    }

    async fn handle(&mut self, request: SpellbookRequest) -> Option<RenderRequest> {
        match request {
            SpellbookRequest::Render(render) => Some(render),
            SpellbookRequest::Dispatch { action, reply } => {
                let result = self.state.dispatch(action).await;
                let render = match &result {
                    Ok(render) => Some(render.clone()),
                    Err(err) => {
                        tracing::warn!(actor_id = %self.state.actor_id(), error = %err, "Action failed");
                        None
                    }
                };
                let _ = reply.send(result);
                render
            }
            SpellbookRequest::Commit { reply } => {
                let result = self.state.commit().await;
                let render = match &result {
                    Ok(_) => Some(RenderRequest::full()),
                    Err(err) => {
                        tracing::error!(actor_id = %self.state.actor_id(), error = %err, "Commit failed");
                        None
                    }
                };
                let _ = reply.send(result);
                render
            }
        }
    }

    fn publish(&mut self, render: RenderRequest) {
        self.version += 1;
        tracing::debug!(
            actor_id = %self.state.actor_id(),
            version = self.version,
            full = render.is_full(),
            "Publishing spellbook view"
        );
        self.views.send_replace(Rendered {
            version: self.version,
            render,
            view: self.state.view(),
        });
    }
}

/// Cloneable client side of a [`SpellbookWorker`].
#[derive(Clone)]
pub struct SpellbookHandle {
    requests: mpsc::Sender<SpellbookRequest>,
    views: watch::Receiver<Rendered>,
}

impl SpellbookHandle {
    pub async fn render(&self, render: RenderRequest) -> Result<(), WorkerError> {
        self.requests
            .send(SpellbookRequest::Render(render))
            .await
            .map_err(|_| WorkerError::Closed)
    }

    pub async fn dispatch(&self, action: Action) -> Result<RenderRequest, WorkerError> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(SpellbookRequest::Dispatch { action, reply })
            .await
            .map_err(|_| WorkerError::Closed)?;
        Ok(response.await.map_err(|_| WorkerError::Closed)??)
    }

    pub async fn commit(&self) -> Result<CommitReport, WorkerError> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(SpellbookRequest::Commit { reply })
            .await
            .map_err(|_| WorkerError::Closed)?;
        Ok(response.await.map_err(|_| WorkerError::Closed)??)
    }

    /// Subscribe to published views.
    pub fn views(&self) -> watch::Receiver<Rendered> {
        self.views.clone()
    }

    pub fn current(&self) -> SpellbookView {
        self.views.borrow().view.clone()
    }
}
