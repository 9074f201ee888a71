//! Async client handle for a worker thread.

use std::path::Path;
use std::thread;

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::engine::EngineLoader;

use super::error::{WorkerError, WorkerResult};
use super::protocol::{
    ConnectOptions, ConnectionHandle, ResultSet, WorkerReply, WorkerRequest, WorkerResponse,
};
use super::state::Worker;

/// Requests buffered at the channel boundary. The worker still acts on at
/// most one request at a time.
const CHANNEL_CAPACITY: usize = 16;

/// One channel message: the operation plus the slot its response is
/// delivered on.
struct Envelope {
    request: WorkerRequest,
    reply: oneshot::Sender<WorkerResponse>,
}

/// Caller-facing handle to a worker.
///
/// Native engine calls block, so the worker runs on its own dedicated OS
/// thread rather than a tokio task; the handle communicates with it over an
/// mpsc channel that preserves send order. The worker replies to each request
/// before taking the next, and every request carries its own reply slot, so
/// responses always reach the caller that sent the request — even a caller
/// that (against the single-in-flight discipline) pipelines requests cannot
/// receive another request's response.
///
/// Requests are never cancelled mid-flight: once sent, an operation runs to
/// completion and its reply is delivered or discarded with the dropped
/// receiver.
pub struct WorkerClient {
    tx: mpsc::Sender<Envelope>,
    _thread: thread::JoinHandle<()>,
}

impl WorkerClient {
    /// Spawn a worker on its own thread. The loader, the engine it produces
    /// and the connection session are owned by that thread for its entire
    /// lifetime.
    pub fn spawn<L>(loader: L) -> Self
    where
        L: EngineLoader + 'static,
    {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let thread = thread::Builder::new()
            .name("mssql-worker".to_string())
            .spawn(move || run(Worker::new(loader), rx))
            .expect("worker thread not spawned");
        Self { tx, _thread: thread }
    }

    /// Send a request and await the matching response.
    pub async fn request(&self, request: WorkerRequest) -> WorkerResponse {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Envelope {
                request,
                reply: reply_tx,
            })
            .await
            .map_err(|_| WorkerError::Terminated)?;
        reply_rx.await.map_err(|_| WorkerError::ChannelClosed)?
    }

    /// Load the native engine library.
    pub async fn load_library(&self, path: impl AsRef<Path>) -> WorkerResult<()> {
        match self
            .request(WorkerRequest::LoadLibrary(path.as_ref().to_path_buf()))
            .await?
        {
            WorkerReply::LibraryLoaded => Ok(()),
            _ => Err(mismatched_reply("loadLibrary")),
        }
    }

    /// Open a connection, replacing any current one.
    pub async fn connect(&self, options: ConnectOptions) -> WorkerResult<ConnectionHandle> {
        match self.request(WorkerRequest::Connect(options)).await? {
            WorkerReply::Connected(handle) => Ok(handle),
            _ => Err(mismatched_reply("openConnection")),
        }
    }

    /// Execute a query against the current connection.
    pub async fn query(&self, query: &str, parameters: &[String]) -> WorkerResult<ResultSet> {
        let request = WorkerRequest::Query {
            query: query.to_string(),
            parameters: parameters.to_vec(),
        };
        match self.request(request).await? {
            WorkerReply::QueryExecuted(result) => Ok(result),
            _ => Err(mismatched_reply("executeQuery")),
        }
    }

    /// Close the current connection; the engine stays loaded.
    pub async fn close(&self) -> WorkerResult<()> {
        match self.request(WorkerRequest::Close).await? {
            WorkerReply::Closed => Ok(()),
            _ => Err(mismatched_reply("closeConnection")),
        }
    }

    /// Shut the worker down. Subsequent requests fail with
    /// [`WorkerError::Terminated`].
    pub async fn shutdown(&self) -> WorkerResult<()> {
        match self.request(WorkerRequest::Shutdown).await? {
            WorkerReply::ShutDown => Ok(()),
            _ => Err(mismatched_reply("shutdown")),
        }
    }

    /// Whether the worker loop is still receiving requests.
    pub fn is_alive(&self) -> bool {
        !self.tx.is_closed()
    }
}

fn mismatched_reply(expected: &str) -> WorkerError {
    WorkerError::InvalidRequest(format!(
        "worker reply did not match the {expected} request"
    ))
}

/// The receive loop running on the worker thread.
fn run<L: EngineLoader>(mut worker: Worker<L>, mut rx: mpsc::Receiver<Envelope>) {
    while let Some(Envelope { request, reply }) = rx.blocking_recv() {
        let last = matches!(request, WorkerRequest::Shutdown);
        let response = worker.handle(request);
        // A dropped caller just discards its reply.
        let _ = reply.send(response);
        if last {
            break;
        }
    }
    // Refuse anything already buffered behind a shutdown, then drop the
    // receiver so later sends fail fast at the client.
    rx.close();
    while let Ok(envelope) = rx.try_recv() {
        let _ = envelope.reply.send(Err(WorkerError::Terminated));
    }
    debug!("worker loop stopped");
    // `Worker`'s Drop closes any open connection when the client was
    // dropped without a shutdown.
}
