//! # mssql-bridge
//!
//! Serialized access to a native MSSQL query engine through a single-owner
//! worker actor.
//!
//! The native engine is an external, unmodified library treated as an opaque
//! dependency: four fallible operations (open connection, close connection,
//! execute query, free result), each allocating a result payload that must
//! be released exactly once. Everything interesting here is the protocol
//! around it:
//!
//! ```text
//! ClientProxy ──(request)──▶ Worker ──▶ NativeEngine ──▶ ResultDecoder
//!      ▲                                                       │
//!      └───────────────────────(response)──────────────────────┘
//! ```
//!
//! - [`worker::WorkerClient`] — caller-facing async handle; one request in
//!   flight at a time, one response per request.
//! - [`worker::Worker`] — the state machine; owns the engine and the
//!   session, processes requests serially on a dedicated thread, reconnects
//!   once and retries once when a query fails.
//! - [`session::ConnectionSession`] — the current connection handle and the
//!   options used to open it.
//! - [`engine`] — the engine trait seam, the payload decoder with its
//!   release-exactly-once guarantee, and scripted test doubles.
//!
//! The worker thread exclusively owns the engine, the session and the live
//! connection handle, so no locking exists anywhere in the data path:
//! concurrency is pushed entirely to the channel boundary.

pub mod config;
pub mod engine;
pub mod session;
pub mod worker;

pub use worker::protocol::{ConnectOptions, ConnectionHandle, ResultSet};
pub use worker::{Worker, WorkerClient, WorkerError, WorkerResult, WorkerState};
