//! End-to-end tests for the async worker client.
//!
//! These drive the full path: client handle → channel → worker thread →
//! engine → decoder → response, against the scripted engine's canonical
//! 5-row `foobar` fixture.

use mssql_bridge::engine::test_utils::{MockEngine, MockLoader};
use mssql_bridge::worker::WorkerClient;
use mssql_bridge::{ConnectOptions, WorkerError};

fn connect_options() -> ConnectOptions {
    ConnectOptions {
        host: "localhost".to_string(),
        port: 1433,
        instance: "MSSQLSERVER".to_string(),
        database: "testdb".to_string(),
        user: "sa".to_string(),
        password: "secret".to_string(),
        trust_cert: true,
    }
}

fn params(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[tokio::test]
async fn worker_round_trips() {
    let engine = MockEngine::new();
    let client = WorkerClient::spawn(MockLoader::new(engine.clone()));
    client.load_library("./native/mssql_engine.dll").await.unwrap();

    for _ in 0..4 {
        let handle = client.connect(connect_options()).await.unwrap();
        assert!(!handle.as_str().is_empty());

        for _ in 0..4 {
            let result = client.query("select * from foobar", &[]).await.unwrap();
            assert_eq!(result.metadata, ["foo", "bar", "baz"]);
            assert_eq!(result.rows.len(), 5);
            assert!(result.rows.iter().all(|row| row.len() == 3));
            assert_eq!(result.rows[2], ["foo3", "44", "bar3"]);
        }

        let err = client
            .query("select fail__ from foobar", &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("fail__"));

        let result = client
            .query(
                "select * from foobar where foo = @P1 and str(bar) = str(@P2)",
                &params(&["foo3", "44"]),
            )
            .await
            .unwrap();
        assert_eq!(result.metadata, ["foo", "bar", "baz"]);
        assert_eq!(result.rows, [["foo3", "44", "bar3"]]);

        client.close().await.unwrap();
    }

    client.shutdown().await.unwrap();

    let err = client.query("select 1", &[]).await.unwrap_err();
    assert!(err.is_terminal());

    // All native resources are balanced once the worker is gone. Each
    // iteration opens twice (connect plus the reconnect behind the failing
    // query) and closes twice (reconnect plus the explicit close).
    assert_eq!(engine.opens(), 8);
    assert_eq!(engine.closes(), 8);
    assert_eq!(engine.outstanding_payloads(), 0);
    assert_eq!(engine.allocated(), engine.freed());
}

#[tokio::test]
async fn read_queries_are_deterministic() {
    let engine = MockEngine::new();
    let client = WorkerClient::spawn(MockLoader::new(engine.clone()));
    client.load_library("./engine.dll").await.unwrap();
    client.connect(connect_options()).await.unwrap();

    let first = client.query("select * from foobar", &[]).await.unwrap();
    let second = client.query("select * from foobar", &[]).await.unwrap();
    assert_eq!(first, second);

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn query_before_connect_fails_then_recovers() {
    let engine = MockEngine::new();
    let client = WorkerClient::spawn(MockLoader::new(engine.clone()));
    client.load_library("./engine.dll").await.unwrap();

    let err = client
        .query("select * from foobar", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, WorkerError::NotConnected));

    // The loop survived the protocol misuse.
    client.connect(connect_options()).await.unwrap();
    let result = client.query("select * from foobar", &[]).await.unwrap();
    assert_eq!(result.rows.len(), 5);

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn connect_before_load_is_a_protocol_error() {
    let client = WorkerClient::spawn(MockLoader::new(MockEngine::new()));
    let err = client.connect(connect_options()).await.unwrap_err();
    assert!(matches!(err, WorkerError::EngineNotLoaded));
    assert!(err.is_protocol_misuse());
    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn load_failure_keeps_the_loop_responsive() {
    let client = WorkerClient::spawn(MockLoader::failing("engine library missing"));
    let err = client.load_library("./engine.dll").await.unwrap_err();
    assert!(err.to_string().contains("engine library missing"));
    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn transient_failure_is_retried_after_reconnect() {
    let engine = MockEngine::new();
    let client = WorkerClient::spawn(MockLoader::new(engine.clone()));
    client.load_library("./engine.dll").await.unwrap();
    client.connect(connect_options()).await.unwrap();

    engine.fail_next_query("connection reset by peer");
    let result = client.query("select * from foobar", &[]).await.unwrap();
    assert_eq!(result.rows.len(), 5);

    // One reconnect happened behind the scenes.
    assert_eq!(engine.opens(), 2);
    assert_eq!(engine.closes(), 1);
    assert_eq!(engine.queries().len(), 2);

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn persistent_failure_surfaces_the_retry_error() {
    let engine = MockEngine::new();
    let client = WorkerClient::spawn(MockLoader::new(engine.clone()));
    client.load_library("./engine.dll").await.unwrap();
    client.connect(connect_options()).await.unwrap();

    engine.fail_next_query("first failure");
    engine.fail_next_query("second failure");
    let err = client
        .query("select * from foobar", &[])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("second failure"));
    assert_eq!(engine.opens(), 2);
    assert_eq!(engine.queries().len(), 2);

    client.shutdown().await.unwrap();
}
