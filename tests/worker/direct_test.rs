//! Tests for the synchronous worker surface: the state machine driven
//! directly, without the channel, through typed calls and through the raw
//! JSON message surface.

use std::path::Path;

use mssql_bridge::engine::test_utils::{MockEngine, MockLoader};
use mssql_bridge::worker::Worker;
use mssql_bridge::{ConnectOptions, WorkerError, WorkerState};

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

#[test]
fn direct_round_trips() {
    let engine = MockEngine::new();
    let mut worker = Worker::new(MockLoader::new(engine.clone()));
    worker
        .load_library(Path::new("./native/mssql_engine.dll"))
        .unwrap();

    for _ in 0..4 {
        worker.connect(connect_options()).unwrap();

        for _ in 0..4 {
            let result = worker.query("select * from foobar", &[]).unwrap();
            assert_eq!(result.metadata, ["foo", "bar", "baz"]);
            assert_eq!(result.rows.len(), 5);
            assert_eq!(result.rows[2], ["foo3", "44", "bar3"]);
        }

        let err = worker
            .query("select fail__ from foobar", &[])
            .unwrap_err();
        assert!(err.to_string().contains("fail__"));

        let result = worker
            .query(
                "select * from foobar where foo = @P1 and str(bar) = str(@P2)",
                &params(&["foo3", "44"]),
            )
            .unwrap();
        assert_eq!(result.rows, [["foo3", "44", "bar3"]]);

        worker.close().unwrap();
    }

    worker.shutdown().unwrap();
    assert_eq!(worker.state(), WorkerState::Terminated);
    assert!(matches!(
        worker.query("select 1", &[]).unwrap_err(),
        WorkerError::Terminated
    ));

    // Two opens and two closes per iteration: the failing query costs one
    // reconnect on top of the explicit connect/close pair.
    assert_eq!(engine.opens(), 8);
    assert_eq!(engine.closes(), 8);
    assert_eq!(engine.outstanding_payloads(), 0);
    assert_eq!(engine.allocated(), engine.freed());
}

#[test]
fn json_message_surface_round_trips() {
    let engine = MockEngine::new();
    let mut worker = Worker::new(MockLoader::new(engine.clone()));

    let response = worker.handle_message(r#"{"loadLibrary":{"libPath":"./engine.dll"}}"#);
    assert_eq!(response, r#"{"loadLibrary":{}}"#);

    let response = worker.handle_message(
        r#"{"openConnection":{"host":"localhost","port":1433,"instance":"MSSQLSERVER","database":"testdb","user":"sa","password":"secret","trustCert":true}}"#,
    );
    assert_eq!(response, r#"{"openConnection":{"handle":"1"}}"#);

    let response =
        worker.handle_message(r#"{"executeQuery":{"query":"select * from foobar","parameters":[]}}"#);
    let parsed: serde_json::Value = serde_json::from_str(&response).unwrap();
    assert_eq!(parsed["executeQuery"]["metadata"][0], "foo");
    assert_eq!(parsed["executeQuery"]["data"].as_array().unwrap().len(), 5);
    assert_eq!(parsed["executeQuery"]["data"][2][1], "44");

    let response = worker
        .handle_message(r#"{"executeQuery":{"query":"select fail__ from foobar","parameters":[]}}"#);
    let parsed: serde_json::Value = serde_json::from_str(&response).unwrap();
    assert!(parsed["error"].as_str().unwrap().contains("fail__"));

    let response = worker.handle_message(r#"{"closeConnection":{}}"#);
    assert_eq!(response, r#"{"closeConnection":{}}"#);

    let response = worker.handle_message(r#"{"shutdown":true}"#);
    assert_eq!(response, r#"{"shutdown":{}}"#);

    let response = worker.handle_message(r#"{"closeConnection":{}}"#);
    let parsed: serde_json::Value = serde_json::from_str(&response).unwrap();
    assert!(parsed["error"].as_str().unwrap().contains("terminated"));
}

#[test]
fn malformed_messages_get_error_responses() {
    let engine = MockEngine::new();
    let mut worker = Worker::new(MockLoader::new(engine.clone()));

    // Not JSON at all.
    let parsed: serde_json::Value =
        serde_json::from_str(&worker.handle_message("not json")).unwrap();
    assert!(parsed["error"]
        .as_str()
        .unwrap()
        .contains("malformed worker message"));

    // No variant populated.
    let parsed: serde_json::Value =
        serde_json::from_str(&worker.handle_message("{}")).unwrap();
    assert!(parsed["error"].as_str().unwrap().contains("exactly one"));

    // Two variants populated.
    let parsed: serde_json::Value = serde_json::from_str(
        &worker.handle_message(r#"{"closeConnection":{},"shutdown":true}"#),
    )
    .unwrap();
    assert!(parsed["error"].as_str().unwrap().contains("exactly one"));

    // Still alive: a valid request now succeeds.
    let response = worker.handle_message(r#"{"loadLibrary":{"libPath":"./engine.dll"}}"#);
    assert_eq!(response, r#"{"loadLibrary":{}}"#);
}
