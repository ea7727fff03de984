use futures::StreamExt as _;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

use crate::content::RunOutput;
use crate::errors::RouterError;
use crate::router::DisplayStream;
use crate::stream::RouteEvent;

/// Handle used to request cancellation of a spawned run.
#[derive(Clone)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    /// Requests cancellation.
    ///
    /// Cancellation is best-effort and becomes visible as a terminal
    /// `RouteEvent::Error` with `RouterError::Cancelled`. The in-flight node
    /// sub-stream is released before that event is sent.
    pub fn abort(&self) {
        let _ = self.tx.send(true);
    }
}

/// Streaming handle returned by `Router::spawn`.
///
/// Use `next_event()` to consume events as they arrive and `finish()` to obtain
/// the final result after the terminal event. Dropping the handle stops the
/// background task.
pub struct RunStream {
    run_id: uuid::Uuid,
    agent: String,
    rx: mpsc::Receiver<RouteEvent>,
    final_rx: oneshot::Receiver<Result<RunOutput, RouterError>>,
    abort_handle: AbortHandle,
    saw_terminal: bool,
}

impl RunStream {
    pub fn run_id(&self) -> uuid::Uuid {
        self.run_id
    }

    /// Returns a handle that can cancel the run.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort_handle.clone()
    }

    /// Waits for and returns the next event.
    ///
    /// Returns `None` after the stream channel is closed.
    pub async fn next_event(&mut self) -> Option<RouteEvent> {
        let event = self.rx.recv().await;
        if event.as_ref().is_some_and(RouteEvent::is_terminal) {
            self.saw_terminal = true;
        }
        event
    }

    /// Drains the stream (if needed) and returns the terminal run result.
    ///
    /// This is safe to call after consuming events manually with `next_event()`.
    pub async fn finish(mut self) -> Result<RunOutput, RouterError> {
        while !self.saw_terminal {
            match self.rx.recv().await {
                Some(event) if event.is_terminal() => self.saw_terminal = true,
                Some(_) => {}
                None => break,
            }
        }

        match self.final_rx.await {
            Ok(result) => result,
            Err(_) => Err(RouterError::protocol_msg(format!(
                "run task ended without final result (agent={})",
                self.agent
            ))),
        }
    }
}

pub(crate) fn spawn_run(
    runtime: &tokio::runtime::Handle,
    run_id: uuid::Uuid,
    agent: String,
    chunks: DisplayStream,
    buffer_capacity: usize,
) -> RunStream {
    let (tx, rx) = mpsc::channel(buffer_capacity);
    let (final_tx, final_rx) = oneshot::channel();
    let (abort_tx, abort_rx) = watch::channel(false);

    runtime.spawn(run_task(
        run_id,
        agent.clone(),
        chunks,
        tx,
        final_tx,
        abort_rx,
    ));

    RunStream {
        run_id,
        agent,
        rx,
        final_rx,
        abort_handle: AbortHandle { tx: abort_tx },
        saw_terminal: false,
    }
}

async fn run_task(
    run_id: uuid::Uuid,
    agent: String,
    mut chunks: DisplayStream,
    tx: mpsc::Sender<RouteEvent>,
    final_tx: oneshot::Sender<Result<RunOutput, RouterError>>,
    mut abort_rx: watch::Receiver<bool>,
) {
    if !send_event(&tx, RouteEvent::RunStarted { run_id, agent }).await {
        let _ = final_tx.send(Err(RouterError::protocol_msg(
            "run stream receiver dropped before RunStarted",
        )));
        return;
    }

    let mut seq = 0_u64;
    let mut forwarded: Vec<String> = Vec::new();
    let mut abort_open = true;
    loop {
        tokio::select! {
            changed = abort_rx.changed(), if abort_open => {
                match changed {
                    Ok(()) if *abort_rx.borrow() => {
                        drop(chunks);
                        debug!(run_id = %run_id, seq, "spawned run cancelled");
                        let error = RouterError::Cancelled;
                        let _ = send_event(&tx, RouteEvent::Error { run_id, error: error.clone() }).await;
                        let _ = final_tx.send(Err(error));
                        return;
                    }
                    Ok(()) => {}
                    Err(_) => abort_open = false,
                }
            }
            () = tx.closed() => {
                debug!(run_id = %run_id, seq, "run stream receiver dropped, stopping run");
                return;
            }
            next = chunks.next() => {
                match next {
                    Some(Ok(text)) => {
                        forwarded.push(text.clone());
                        let sent = send_event(&tx, RouteEvent::Chunk { run_id, seq, text }).await;
                        seq = seq.saturating_add(1);
                        if !sent {
                            let _ = final_tx.send(Err(RouterError::protocol_msg("run stream receiver dropped during output")));
                            return;
                        }
                    }
                    Some(Err(error)) => {
                        drop(chunks);
                        let _ = send_event(&tx, RouteEvent::Error { run_id, error: error.clone() }).await;
                        let _ = final_tx.send(Err(error));
                        return;
                    }
                    None => {
                        let output = RunOutput { chunks: forwarded };
                        let sent = send_event(&tx, RouteEvent::Completed { run_id, output: output.clone() }).await;
                        let _ = final_tx.send(if sent { Ok(output) } else { Err(RouterError::protocol_msg("run stream receiver dropped before completion")) });
                        return;
                    }
                }
            }
        }
    }
}

async fn send_event(tx: &mpsc::Sender<RouteEvent>, event: RouteEvent) -> bool {
    tx.send(event).await.is_ok()
}
