//! Worker communication module.
//!
//! One background thread owns one native engine instance and one database
//! connection, and serializes every operation on them. Callers talk to it
//! through [`WorkerClient`] over an async request/response channel; the
//! worker processes requests strictly in arrival order and emits exactly one
//! response per request.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Callers (any task/thread)                │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │                  WorkerClient (async)                  │  │
//! │  │  - sends WorkerRequest + oneshot reply slot            │  │
//! │  │  - awaits the matching WorkerResponse                  │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │                   mpsc channel │ (send order preserved)      │
//! └────────────────────────────────┼─────────────────────────────┘
//!                                  ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │            Worker (dedicated single-owner thread)            │
//! │   Worker state machine ─ ConnectionSession ─ NativeEngine    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use mssql_bridge::worker::WorkerClient;
//!
//! let client = WorkerClient::spawn(loader);
//! client.load_library("./native/mssql_engine.dll").await?;
//! client.connect(options).await?;
//! let result = client.query("select * from foobar", &[]).await?;
//! client.shutdown().await?;
//! ```

mod client;
mod error;
pub mod protocol;
mod state;

pub use client::WorkerClient;
pub use error::{WorkerError, WorkerResult};
pub use state::{Worker, WorkerState};
