//! Integration tests for the HTTP surface over a real loopback listener.

use std::sync::Arc;
use std::time::Duration;

use chunkflow::pipeline::{Pipeline, PipelineConfig};
use chunkflow::server::{self, AppState};
use chunkflow::{AppendLog, IndexedStore};
use reqwest::StatusCode;
use serde_json::Value;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct TestServer {
    base: String,
    addr: std::net::SocketAddr,
    pipeline: Arc<Pipeline>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<std::io::Result<()>>,
    _dir: TempDir,
}

struct Options {
    pipeline: PipelineConfig,
    start: bool,
    max_body_bytes: usize,
    request_timeout: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            start: true,
            max_body_bytes: 1024 * 1024,
            request_timeout: Duration::from_secs(10),
        }
    }
}

async fn spawn_server(options: Options) -> TestServer {
    let dir = TempDir::new().unwrap();
    let log = AppendLog::open(dir.path().join("data.db")).unwrap();
    let pipeline = Arc::new(Pipeline::new(
        options.pipeline,
        Arc::new(IndexedStore::new()),
        Arc::new(log),
    ));
    if options.start {
        pipeline.start().unwrap();
    }

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = server::router(
        AppState::new(pipeline.clone(), options.max_body_bytes),
        options.request_timeout,
    );

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(server::serve(
        listener,
        app,
        async move {
            let _ = shutdown_rx.await;
        },
        Duration::from_secs(1),
    ));

    TestServer {
        base: format!("http://{addr}"),
        addr,
        pipeline,
        shutdown: Some(shutdown_tx),
        handle,
        _dir: dir,
    }
}

/// Loopback client that ignores any proxy configured in the environment.
fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

fn upload(client: &reqwest::Client, server: &TestServer) -> reqwest::RequestBuilder {
    client.post(format!("{}/upload", server.base))
}

async fn poll_chunk(client: &reqwest::Client, server: &TestServer, id: &str) -> Option<Value> {
    for _ in 0..200 {
        let response = client
            .get(format!("{}/chunks/{id}", server.base))
            .send()
            .await
            .unwrap();
        if response.status() == StatusCode::OK {
            return Some(response.json().await.unwrap());
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    None
}

#[tokio::test]
async fn test_upload_accepted_and_eventually_stamped() {
    let server = spawn_server(Options::default()).await;
    let client = client();

    let response = upload(&client, &server)
        .header("userId", "u1")
        .header("sessionId", "s1")
        .header("timeStamp", "1690000000")
        .body("hello")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let accepted: Value = response.json().await.unwrap();
    let id = accepted["id"].as_str().unwrap().to_string();
    assert!(!id.is_empty());
    assert_eq!(accepted["submitter_id"], "u1");
    assert_eq!(accepted["session_id"], "s1");
    assert_eq!(accepted["ingest_timestamp"], 1_690_000_000);
    assert_eq!(accepted["payload"], "aGVsbG8=");
    assert!(accepted["metadata"].is_null());

    let stored = poll_chunk(&client, &server, &id).await.expect("record stored");
    let metadata = stored["metadata"].as_object().unwrap();
    for key in ["checksum", "transformed_at", "fake_transcript", "extracted_at"] {
        assert!(metadata.contains_key(key), "missing {key}");
    }
    assert_eq!(metadata["checksum"], "deadbeef");
}

#[tokio::test]
async fn test_upload_missing_session_header_is_rejected() {
    let server = spawn_server(Options::default()).await;
    let client = client();

    let response = upload(&client, &server)
        .header("userId", "u1")
        .header("timeStamp", "1690000000")
        .body("hello")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.text().await.unwrap(), "missing required headers");

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(server.pipeline.stats().snapshot().submitted, 0);
    assert!(server.pipeline.store().is_empty());
}

#[tokio::test]
async fn test_upload_missing_or_empty_headers_are_rejected() {
    let server = spawn_server(Options::default()).await;
    let client = client();

    let cases: [&[(&str, &str)]; 4] = [
        &[("sessionId", "s1"), ("timeStamp", "1")],
        &[("userId", "u1"), ("sessionId", "s1")],
        &[("userId", "u1"), ("sessionId", "s1"), ("timeStamp", "")],
        &[("userId", ""), ("sessionId", "s1"), ("timeStamp", "1")],
    ];
    for headers in cases {
        let mut request = upload(&client, &server).body("hello");
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let response = request.send().await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "headers: {headers:?}");
        assert_eq!(response.text().await.unwrap(), "missing required headers");
    }

    assert_eq!(server.pipeline.stats().snapshot().submitted, 0);
}

#[tokio::test]
async fn test_upload_bad_timestamp_is_rejected() {
    let server = spawn_server(Options::default()).await;
    let client = client();

    let response = upload(&client, &server)
        .header("userId", "u1")
        .header("sessionId", "s1")
        .header("timeStamp", "yesterday")
        .body("hello")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.text().await.unwrap(), "invalid timestamp");
}

#[tokio::test]
async fn test_upload_empty_body_accepted_but_never_stored() {
    let server = spawn_server(Options::default()).await;
    let client = client();

    let response = upload(&client, &server)
        .header("userId", "u1")
        .header("sessionId", "s1")
        .header("timeStamp", "1")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let id = response.json::<Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    for _ in 0..200 {
        if server.pipeline.stats().snapshot().dropped_invalid == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(server.pipeline.stats().snapshot().dropped_invalid, 1);

    let response = client
        .get(format!("{}/chunks/{id}", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_over_body_limit_is_unreadable() {
    let server = spawn_server(Options {
        max_body_bytes: 8,
        ..Options::default()
    })
    .await;
    let client = client();

    let response = upload(&client, &server)
        .header("userId", "u1")
        .header("sessionId", "s1")
        .header("timeStamp", "1")
        .body(vec![7u8; 64])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(server.pipeline.stats().snapshot().submitted, 0);
}

#[tokio::test]
async fn test_upload_backpressure_returns_429() {
    let server = spawn_server(Options {
        pipeline: PipelineConfig {
            queue_capacity: 1,
            workers: 1,
        },
        start: false,
        ..Options::default()
    })
    .await;
    let client = client();

    let send = || {
        upload(&client, &server)
            .header("userId", "u1")
            .header("sessionId", "s1")
            .header("timeStamp", "1")
            .body("x")
            .send()
    };

    assert_eq!(send().await.unwrap().status(), StatusCode::ACCEPTED);
    let rejected = send().await.unwrap();
    assert_eq!(rejected.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(rejected.text().await.unwrap(), "backpressure: queue full");
}

#[tokio::test]
async fn test_get_unknown_chunk_is_404() {
    let server = spawn_server(Options::default()).await;
    let response = client()
        .get(format!("{}/chunks/does-not-exist", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sessions_route_lists_by_submitter() {
    let server = spawn_server(Options::default()).await;
    let client = client();

    let mut ids = Vec::new();
    for session in ["s1", "s2"] {
        let response = upload(&client, &server)
            .header("userId", "u1")
            .header("sessionId", session)
            .header("timeStamp", "1")
            .body("x")
            .send()
            .await
            .unwrap();
        let body: Value = response.json().await.unwrap();
        ids.push(body["id"].as_str().unwrap().to_string());
    }
    for id in &ids {
        assert!(poll_chunk(&client, &server, id).await.is_some());
    }

    // The path segment is a submitter id, not a session id
    let by_user: Vec<Value> = client
        .get(format!("{}/sessions/u1", server.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(by_user.len(), 2);

    let by_session: Vec<Value> = client
        .get(format!("{}/sessions/s1", server.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(by_session.is_empty());
}

#[tokio::test]
async fn test_stats_reports_phase_and_counters() {
    let server = spawn_server(Options {
        start: false,
        ..Options::default()
    })
    .await;

    let stats: Value = client()
        .get(format!("{}/stats", server.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["phase"], "stopped");
    assert_eq!(stats["counters"]["submitted"], 0);
    assert_eq!(stats["queues"]["ingest"], 0);
    assert_eq!(stats["stored_records"], 0);
}

#[tokio::test]
async fn test_stalled_request_times_out() {
    let server = spawn_server(Options {
        request_timeout: Duration::from_millis(200),
        ..Options::default()
    })
    .await;

    // Announce a body and never send it
    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream
        .write_all(
            b"POST /upload HTTP/1.1\r\nHost: localhost\r\nuserId: u1\r\nsessionId: s1\r\n\
              timeStamp: 1\r\nContent-Length: 100\r\n\r\npartial",
        )
        .await
        .unwrap();

    let mut buf = vec![0u8; 1024];
    let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
        .await
        .unwrap()
        .unwrap();
    let response = String::from_utf8_lossy(&buf[..n]);
    assert!(response.starts_with("HTTP/1.1 408"), "got: {response}");
}

#[tokio::test]
async fn test_graceful_shutdown_stops_serving() {
    let mut server = spawn_server(Options::default()).await;

    server.shutdown.take().unwrap().send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), &mut server.handle)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());

    let after = client()
        .get(format!("{}/stats", server.base))
        .send()
        .await;
    assert!(after.is_err());
}
