//! End-to-end delivery against an in-process endpoint that behaves like the
//! telemetry receiver: Basic auth checked, JSON bodies recorded.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use pocketlife::probes::report;
use pocketlife::{Category, Coordinator, DeliveryConfig, PostOutcome, build, serialize};
use std::io::Read;
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

const USERNAME: &str = "telemetry";
const PASSWORD: &str = "s3cret";

/**
 * Serve `expected` requests, answering 401 on bad credentials and 200
 * otherwise. Returns the bodies that were accepted.
 */
fn spawn_receiver(server: tiny_http::Server, expected: usize) -> thread::JoinHandle<Vec<String>> {
    let expected_auth = format!("Basic {}", BASE64.encode(format!("{}:{}", USERNAME, PASSWORD)));

    thread::spawn(move || {
        let mut accepted = Vec::new();
        for _ in 0..expected {
            let Ok(Some(mut request)) = server.recv_timeout(Duration::from_secs(10)) else {
                break;
            };

            let mut body = String::new();
            request.as_reader().read_to_string(&mut body).unwrap();

            let authorized = request
                .headers()
                .iter()
                .any(|h| h.field.equiv("Authorization") && h.value.as_str() == expected_auth);

            let response = if authorized {
                accepted.push(body);
                tiny_http::Response::from_string(r#"{"status":"success"}"#).with_status_code(200)
            } else {
                tiny_http::Response::from_string(r#"{"error":"Invalid credentials."}"#)
                    .with_status_code(401)
            };
            request.respond(response).unwrap();
        }
        accepted
    })
}

fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

#[test]
fn backlog_flushes_once_endpoint_comes_back() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::TempDir::new().unwrap();
    let port = free_port();

    let config = DeliveryConfig::new(USERNAME, PASSWORD, format!("http://127.0.0.1:{}/api", port))
        .with_queue_path(dir.path().join("queue.json"))
        .with_request_timeout(5);
    let coordinator = Coordinator::new(config).unwrap();

    // Endpoint down: both events are buffered, in order
    let first = build(Category::Bandwidth, vec!["sent_kb: 1.0 received_kb: 2.0".into()]);
    let second = build(Category::Arguments, vec!["[\"app\", \"--verbose\"]".into()]);
    assert_eq!(coordinator.post(&first), PostOutcome::Queued);
    assert_eq!(coordinator.post(&second), PostOutcome::Queued);
    assert_eq!(coordinator.queue().len().unwrap(), 2);

    // Endpoint up: backlog replayed first, then the new event
    let server = tiny_http::Server::http(("127.0.0.1", port)).unwrap();
    let receiver = spawn_receiver(server, 3);

    let third = build(Category::ProgramUsage, vec!["3.5".into(), "20.0 MB".into()]);
    assert_eq!(coordinator.post(&third), PostOutcome::Delivered);

    let accepted = receiver.join().unwrap();
    assert_eq!(
        accepted,
        vec![
            serialize(&first).into_string(),
            serialize(&second).into_string(),
            serialize(&third).into_string(),
        ]
    );
    assert!(coordinator.queue().is_empty().unwrap());
}

#[test]
fn rejected_credentials_keep_event_queued() {
    let dir = tempfile::TempDir::new().unwrap();
    let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let receiver = spawn_receiver(server, 1);

    let config = DeliveryConfig::new(USERNAME, "wrong-password", format!("http://{}/api", addr))
        .with_queue_path(dir.path().join("queue.json"));
    let coordinator = Coordinator::new(config).unwrap();

    let event = build(Category::Arguments, vec!["[]".into()]);
    assert_eq!(coordinator.post(&event), PostOutcome::Queued);

    assert!(receiver.join().unwrap().is_empty());
    assert_eq!(
        coordinator.queue().entries().unwrap(),
        vec![serialize(&event).into_string()]
    );
}

#[test]
fn reporters_post_through_a_coordinator() {
    let dir = tempfile::TempDir::new().unwrap();
    let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let receiver = spawn_receiver(server, 1);

    let config = DeliveryConfig::new(USERNAME, PASSWORD, format!("http://{}/api", addr))
        .with_queue_path(dir.path().join("queue.json"));
    let coordinator = Coordinator::new(config).unwrap();

    assert_eq!(report::bandwidth(&coordinator), PostOutcome::Delivered);

    let accepted = receiver.join().unwrap();
    let body: serde_json::Value = serde_json::from_str(&accepted[0]).unwrap();
    assert!(body["bandwidth"].as_str().unwrap().starts_with("sent_kb: "));
}
