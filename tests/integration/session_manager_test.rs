// tests/integration/session_manager_test.rs

//! Integration tests for the session manager
//! Tests: arbitration between local and remote sessions, poll interval, lifecycle

use super::test_helpers::{TestContext, begin_profile_line, init_tracing};
use profctl::core::protocol::{Response, ReturnCode};
use profctl::core::{ProfCtlError, Request};
use profctl::session::{DORMANT_POLL_INTERVAL, SessionManager, SessionType};
use std::net::TcpStream;
use std::time::Duration;

fn local_begin() -> Request {
    Request::new("beginProfile")
        .with_arg("samplesFilePattern", "/tmp/profctl-it-local-*.samples")
        .with_arg("pollInterval", 20)
        .with_arg("samplesDataCapacity", 65536)
}

// ===== Lifecycle =====

#[test]
fn test_new_manager_is_dormant() {
    init_tracing();
    let manager = SessionManager::new();
    assert_eq!(manager.session_type(), SessionType::Dormant);
    assert_eq!(manager.poll_interval(), DORMANT_POLL_INTERVAL);
    assert_eq!(manager.poll_interval(), Duration::from_millis(500));
    assert_eq!(manager.listener_port(), 0);
    assert!(!manager.is_alive());
    assert!(!manager.is_profile_active());
}

#[test]
fn test_remote_session_can_only_be_enabled_once() {
    init_tracing();
    let mut manager = SessionManager::new();
    manager.enable_remote_session("127.0.0.1", 0).unwrap();

    let err = manager.enable_remote_session("127.0.0.1", 0).unwrap_err();
    assert!(matches!(err, ProfCtlError::RemoteSessionAlreadyEnabled));
    assert_eq!(err.to_string(), "Remote sessions already supported");
}

#[test]
fn test_remote_enabled_after_start_listens_immediately() {
    let mut ctx = TestContext::local_only();
    assert_eq!(ctx.manager.listener_port(), 0);

    ctx.manager.enable_remote_session("127.0.0.1", 0).unwrap();
    assert_ne!(ctx.manager.listener_port(), 0);

    let mut controller = ctx.connect();
    let response = ctx.request(&mut controller, "ping");
    assert_eq!(response, Response::success("pong"));
}

#[test]
fn test_shutdown_is_idempotent_and_stops_polling() {
    let mut ctx = TestContext::new();
    let mut controller = ctx.connect();
    ctx.request(&mut controller, &begin_profile_line(5));
    assert_eq!(ctx.manager.session_type(), SessionType::Remote);
    let port = ctx.manager.listener_port();

    ctx.manager.shutdown();
    assert!(!ctx.manager.is_alive());
    assert!(!ctx.manager.is_profile_active());
    assert_eq!(ctx.manager.session_type(), SessionType::Dormant);
    assert!(controller.wait_closed(|| {}));
    assert!(TcpStream::connect(("127.0.0.1", port)).is_err());

    ctx.manager.shutdown();
    ctx.manager.poll();
    assert_eq!(ctx.manager.session_type(), SessionType::Dormant);
}

// ===== Local ownership =====

#[test]
fn test_local_profile_owns_the_profiler() {
    let mut ctx = TestContext::new();

    let mut begin = local_begin();
    assert!(ctx.manager.execute(&mut begin));
    assert_eq!(ctx.manager.session_type(), SessionType::Local);
    assert_eq!(ctx.manager.poll_interval(), Duration::from_millis(20));

    // The remote controller waits in the backlog while local owns the profiler.
    let mut controller = ctx.connect();
    controller.send("ping");
    let manager = &mut ctx.manager;
    assert!(controller.recv_for(10, || manager.poll()).is_none());
    assert_eq!(ctx.manager.session_type(), SessionType::Local);

    let mut end = Request::new("endProfile");
    assert!(ctx.manager.execute(&mut end));
    assert!(end.response().unwrap().starts_with("profile ended"));
    assert_eq!(ctx.manager.session_type(), SessionType::Dormant);
    assert_eq!(ctx.manager.poll_interval(), DORMANT_POLL_INTERVAL);

    // Now the queued controller is accepted and answered.
    let manager = &mut ctx.manager;
    let response = controller.recv(|| manager.poll()).unwrap();
    assert_eq!(response, Response::success("pong"));
    assert_eq!(ctx.manager.session_type(), SessionType::Remote);
}

#[test]
fn test_collector_is_polled_while_owned() {
    let mut ctx = TestContext::local_only();
    ctx.manager.execute(&mut local_begin());

    for _ in 0..3 {
        ctx.manager.poll();
    }
    let polls = ctx
        .manager
        .handler()
        .profile()
        .collector()
        .map(|collector| collector.polls());
    assert_eq!(polls, Some(3));
}

#[test]
fn test_failed_local_request_keeps_manager_dormant() {
    let mut ctx = TestContext::local_only();

    let mut request = Request::new("beginProfile").with_arg("pollInterval", 5);
    assert!(!ctx.manager.execute(&mut request));
    assert!(request.errors().unwrap().contains("samplesFilePattern"));
    assert_eq!(ctx.manager.session_type(), SessionType::Dormant);
}

// ===== Remote ownership =====

#[test]
fn test_remote_client_owns_the_profiler() {
    let mut ctx = TestContext::new();
    let mut controller = ctx.connect();

    let response = ctx.request(&mut controller, &begin_profile_line(5));
    assert!(response.payload.starts_with("profile started"));
    assert_eq!(ctx.manager.session_type(), SessionType::Remote);
    assert_eq!(ctx.manager.poll_interval(), Duration::from_millis(5));

    // Local requests are turned away while the remote session owns the profiler.
    let mut end = Request::new("endProfile");
    assert!(!ctx.manager.execute(&mut end));
    assert!(end.errors().unwrap().starts_with("Session busy"));
    assert!(ctx.manager.is_profile_active());

    let response = ctx.request(&mut controller, "isProfileActive");
    assert_eq!(response, Response::success("true"));
}

#[tokio::test]
async fn test_local_client_is_busy_while_remote_owns() {
    let mut ctx = TestContext::new();
    let mut controller = ctx.connect();
    ctx.request(&mut controller, "ping");
    assert_eq!(ctx.manager.session_type(), SessionType::Remote);

    let client = ctx.manager.local_client();
    let task = tokio::spawn(async move { client.execute(Request::new("ping")).await });
    while !task.is_finished() {
        ctx.manager.poll();
        tokio::task::yield_now().await;
    }
    let request = task.await.unwrap().unwrap();
    assert!(request.errors().unwrap().starts_with("Session busy"));
    assert_eq!(ctx.manager.session_type(), SessionType::Remote);
}

#[test]
fn test_remote_disconnect_releases_the_profiler() {
    let mut ctx = TestContext::new();
    let mut controller = ctx.connect();
    ctx.request(&mut controller, &begin_profile_line(5));
    assert!(ctx.manager.is_profile_active());

    drop(controller);
    assert!(ctx.poll_until(|manager| manager.session_type() == SessionType::Dormant));
    assert!(!ctx.manager.is_profile_active());
    assert_eq!(ctx.manager.poll_interval(), DORMANT_POLL_INTERVAL);

    // A new controller can take over.
    let mut controller = ctx.connect();
    let response = ctx.request(&mut controller, "isProfileActive");
    assert_eq!(response, Response::success("false"));
}

#[test]
fn test_remote_client_without_profile_leaves_local_changes_alone() {
    let mut ctx = TestContext::new();

    let mut activate = Request::new("activateProbe")
        .with_arg("file", "src/engine.rs")
        .with_arg("line", 42)
        .with_arg("name", "hot_loop");
    assert!(ctx.manager.execute(&mut activate));
    assert!(ctx.manager.execute(&mut Request::new("enableGpPmu").with_arg("count", 2)));
    assert_eq!(ctx.manager.session_type(), SessionType::Dormant);

    let mut controller = ctx.connect();
    ctx.request(&mut controller, "ping");
    drop(controller);
    assert!(ctx.poll_until(|manager| manager.session_type() == SessionType::Dormant));

    let profile = ctx.manager.handler().profile();
    assert_eq!(profile.probes().active_count(), 1);
    assert!(profile.pmu().is_enabled());
    assert_eq!(profile.pmu().gp_count(), 2);
}

#[test]
fn test_remote_failure_response_keeps_ownership() {
    let mut ctx = TestContext::new();
    let mut controller = ctx.connect();

    let response = ctx.request(&mut controller, "endProfile --bogus");
    assert_eq!(response.code, ReturnCode::Failure);
    assert_eq!(ctx.manager.session_type(), SessionType::Remote);
}

// ===== Contention =====

#[tokio::test]
async fn test_local_wins_when_both_arrive_in_the_same_tick() {
    let mut ctx = TestContext::new();

    let client = ctx.manager.local_client();
    let task = tokio::spawn(async move { client.execute(local_begin()).await });
    // Let the task queue its request before the tick.
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    let mut controller = ctx.connect();
    controller.send(&begin_profile_line(5));

    ctx.manager.poll();
    assert_eq!(ctx.manager.session_type(), SessionType::Local);

    let request = task.await.unwrap().unwrap();
    assert!(request.response().unwrap().starts_with("profile started"));

    let manager = &mut ctx.manager;
    assert!(controller.recv_for(10, || manager.poll()).is_none());
    assert_eq!(ctx.manager.session_type(), SessionType::Local);
}
