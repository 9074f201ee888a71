//! Scripted engine doubles for tests.
//!
//! [`MockEngine`] emulates the native engine over a canonical in-memory
//! fixture table (`foobar`: 5 rows, columns `foo`/`bar`/`baz`), with knobs
//! for injecting connect and query failures and full accounting of payload
//! allocations and releases. Handles to the same engine can be cloned so a
//! test can keep probing the state after the engine moved onto a worker
//! thread.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::payload::{ClosePayload, CloseRequest, ConnectPayload, QueryPayload, QueryRequest};
use super::{EngineError, EngineLoader, NativeEngine, RawPayload, NULL_PAYLOAD};

/// Column names of the canonical fixture table.
pub const FIXTURE_COLUMNS: [&str; 3] = ["foo", "bar", "baz"];

/// Rows of the canonical fixture table. Row index 2 is `["foo3","44","bar3"]`.
pub fn fixture_rows() -> Vec<Vec<String>> {
    (1..=5)
        .map(|i| vec![format!("foo{i}"), format!("{}", 41 + i), format!("bar{i}")])
        .collect()
}

#[derive(Default)]
struct MockState {
    payloads: HashMap<RawPayload, Vec<u8>>,
    next_payload: RawPayload,
    allocated: usize,
    freed: usize,
    loads: usize,
    opens: usize,
    closes: usize,
    queries: Vec<String>,
    live_handles: HashSet<String>,
    open_failures: VecDeque<String>,
    query_failures: VecDeque<String>,
    null_payloads: usize,
}

impl MockState {
    fn alloc(&mut self, json: String) -> RawPayload {
        if self.null_payloads > 0 {
            self.null_payloads -= 1;
            return NULL_PAYLOAD;
        }
        self.next_payload += 1;
        self.allocated += 1;
        let mut bytes = json.into_bytes();
        bytes.push(0);
        self.payloads.insert(self.next_payload, bytes);
        self.next_payload
    }

    fn alloc_reply<T: serde::Serialize>(&mut self, reply: &T) -> RawPayload {
        let json = serde_json::to_string(reply).expect("mock reply must serialize");
        self.alloc(json)
    }
}

/// Shared-state scripted engine.
#[derive(Clone, Default)]
pub struct MockEngine {
    state: Arc<Mutex<MockState>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().expect("mock engine state poisoned")
    }

    /// Script the next `open-connection` call to fail with `message`.
    pub fn fail_next_open(&self, message: &str) {
        self.lock().open_failures.push_back(message.to_string());
    }

    /// Script the next `execute-query` call to fail with `message`.
    /// Multiple scripted failures apply in order.
    pub fn fail_next_query(&self, message: &str) {
        self.lock().query_failures.push_back(message.to_string());
    }

    /// Make the next `count` engine calls return a null payload.
    pub fn fail_next_allocations(&self, count: usize) {
        self.lock().null_payloads = count;
    }

    /// Allocate a raw payload directly, for decoder tests.
    pub fn alloc_raw(&mut self, bytes: &[u8]) -> RawPayload {
        let mut state = self.lock();
        state.next_payload += 1;
        state.allocated += 1;
        let key = state.next_payload;
        state.payloads.insert(key, bytes.to_vec());
        key
    }

    pub fn loads(&self) -> usize {
        self.lock().loads
    }

    pub fn opens(&self) -> usize {
        self.lock().opens
    }

    pub fn closes(&self) -> usize {
        self.lock().closes
    }

    /// Query texts in execution order, including failed and retried calls.
    pub fn queries(&self) -> Vec<String> {
        self.lock().queries.clone()
    }

    pub fn allocated(&self) -> usize {
        self.lock().allocated
    }

    pub fn freed(&self) -> usize {
        self.lock().freed
    }

    /// Payloads allocated but not yet released.
    pub fn outstanding_payloads(&self) -> usize {
        self.lock().payloads.len()
    }

    fn run_query(state: &mut MockState, request: &QueryRequest) -> QueryPayload {
        if !state.live_handles.contains(&request.conn_handle) {
            return QueryPayload {
                error: format!("connection handle is not open: [{}]", request.conn_handle),
                metadata: Vec::new(),
                data: Vec::new(),
            };
        }
        if let Some(message) = state.query_failures.pop_front() {
            return QueryPayload {
                error: message,
                metadata: Vec::new(),
                data: Vec::new(),
            };
        }
        if request.query.contains("fail__") {
            return QueryPayload {
                error: "Invalid column name 'fail__'.".to_string(),
                metadata: Vec::new(),
                data: Vec::new(),
            };
        }
        let rows = fixture_rows()
            .into_iter()
            .filter(|row| {
                request
                    .parameters
                    .iter()
                    .enumerate()
                    .all(|(i, param)| row.get(i) == Some(param))
            })
            .collect();
        QueryPayload {
            error: String::new(),
            metadata: FIXTURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            data: rows,
        }
    }
}

impl NativeEngine for MockEngine {
    fn open_connection(&mut self, _request: &[u8]) -> RawPayload {
        let mut state = self.lock();
        let reply = if let Some(message) = state.open_failures.pop_front() {
            ConnectPayload {
                handle: String::new(),
                error: message,
            }
        } else {
            state.opens += 1;
            let handle = state.opens.to_string();
            state.live_handles.insert(handle.clone());
            ConnectPayload {
                handle,
                error: String::new(),
            }
        };
        state.alloc_reply(&reply)
    }

    fn close_connection(&mut self, request: &[u8]) -> RawPayload {
        let mut state = self.lock();
        let reply = match serde_json::from_slice::<CloseRequest>(request) {
            Ok(close) if state.live_handles.remove(&close.conn_handle) => {
                state.closes += 1;
                ClosePayload {
                    error: String::new(),
                }
            }
            Ok(close) => ClosePayload {
                error: format!("unknown connection handle: [{}]", close.conn_handle),
            },
            Err(e) => ClosePayload {
                error: format!("cannot parse close options: [{e}]"),
            },
        };
        state.alloc_reply(&reply)
    }

    fn execute_query(&mut self, request: &[u8]) -> RawPayload {
        let mut state = self.lock();
        let reply = match serde_json::from_slice::<QueryRequest>(request) {
            Ok(query) => {
                state.queries.push(query.query.clone());
                Self::run_query(&mut state, &query)
            }
            Err(e) => QueryPayload {
                error: format!("cannot parse query options: [{e}]"),
                metadata: Vec::new(),
                data: Vec::new(),
            },
        };
        state.alloc_reply(&reply)
    }

    fn read_result(&self, payload: RawPayload) -> Vec<u8> {
        self.lock()
            .payloads
            .get(&payload)
            .unwrap_or_else(|| panic!("read of unknown payload {payload}"))
            .clone()
    }

    fn free_result(&mut self, payload: RawPayload) {
        let mut state = self.lock();
        let removed = state.payloads.remove(&payload);
        assert!(removed.is_some(), "double free of payload {payload}");
        state.freed += 1;
    }
}

/// Loader returning clones of one shared [`MockEngine`].
pub struct MockLoader {
    engine: MockEngine,
    failure: Option<String>,
}

impl MockLoader {
    pub fn new(engine: MockEngine) -> Self {
        Self {
            engine,
            failure: None,
        }
    }

    /// A loader whose `load` always fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            engine: MockEngine::new(),
            failure: Some(message.to_string()),
        }
    }
}

impl EngineLoader for MockLoader {
    fn load(&mut self, _path: &Path) -> Result<Box<dyn NativeEngine>, EngineError> {
        if let Some(message) = &self.failure {
            return Err(EngineError::LoadFailed(message.clone()));
        }
        self.engine.lock().loads += 1;
        Ok(Box::new(self.engine.clone()))
    }
}
