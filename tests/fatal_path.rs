//! Posting without credentials must end the process with status 1.
//!
//! The parent tests re-run this test binary, selecting a single child test
//! through an environment flag, and inspect the child's exit status.

use pocketlife::{Category, Coordinator, DeliveryConfig, build, post};
use std::fs;
use std::process::{Command, Output};

const CHILD_ENV: &str = "POCKETLIFE_FATAL_CHILD";
const QUEUE_ENV: &str = "POCKETLIFE_FATAL_QUEUE";

fn run_child(test_name: &str, envs: &[(&str, &str)]) -> Output {
    let exe = std::env::current_exe().unwrap();
    Command::new(exe)
        .args([test_name, "--exact", "--nocapture", "--test-threads=1"])
        .env(CHILD_ENV, "1")
        .envs(envs.iter().copied())
        .output()
        .unwrap()
}

#[test]
fn global_post_child() {
    if std::env::var_os(CHILD_ENV).is_none() {
        return;
    }

    let event = build(Category::Arguments, vec!["[\"child\"]".into()]);
    post(&event);
    panic!("post returned without configuration");
}

#[test]
fn coordinator_post_child() {
    if std::env::var_os(CHILD_ENV).is_none() {
        return;
    }

    let queue_path = std::env::var(QUEUE_ENV).unwrap();
    let coordinator = Coordinator::new(DeliveryConfig::default().with_queue_path(queue_path)).unwrap();
    let event = build(Category::Bandwidth, vec!["sent_kb: 1.0 received_kb: 1.0".into()]);
    coordinator.post(&event);
    panic!("post returned without credentials");
}

#[test]
fn post_before_configure_terminates_process() {
    if std::env::var_os(CHILD_ENV).is_some() {
        return;
    }

    let output = run_child("global_post_child", &[]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("pocketlife: A telemetry system"));
    assert!(stderr.contains("undefined"));
    assert!(stderr.contains("Quitting!"));
}

#[test]
fn uncredentialed_coordinator_terminates_without_touching_queue() {
    if std::env::var_os(CHILD_ENV).is_some() {
        return;
    }

    let dir = tempfile::TempDir::new().unwrap();
    let queue_path = dir.path().join("queue.json");
    fs::write(&queue_path, "{\"arguments\":\"[]\"}\n").unwrap();

    let queue_arg = queue_path.to_string_lossy().into_owned();
    let output = run_child("coordinator_post_child", &[(QUEUE_ENV, queue_arg.as_str())]);

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        fs::read_to_string(&queue_path).unwrap(),
        "{\"arguments\":\"[]\"}\n"
    );
}
