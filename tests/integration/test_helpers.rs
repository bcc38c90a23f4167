// tests/integration/test_helpers.rs

//! Test helpers and utilities for integration tests

use profctl::core::engine::ProbeKey;
use profctl::core::protocol::{HEADER_LEN, Response, encode_request_frame};
use profctl::session::SessionManager;
use std::io::{ErrorKind, Read, Write};
use std::net::TcpStream;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// How long a helper keeps polling before giving up.
pub const DEADLINE: Duration = Duration::from_secs(5);

/// Installs a quiet subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("warn"))
        .with_test_writer()
        .try_init();
}

/// The probe every test context registers.
pub fn hot_loop_probe() -> ProbeKey {
    ProbeKey::new("src/engine.rs", 42, "hot_loop")
}

/// A `beginProfile` command line with a short poll interval.
pub fn begin_profile_line(poll_ms: u64) -> String {
    format!(
        "beginProfile --samplesFilePattern /tmp/profctl-it-*.samples --pollInterval {poll_ms} --samplesDataCapacity 65536"
    )
}

/// TestContext owns a started session manager with a remote session on an ephemeral port
pub struct TestContext {
    pub manager: SessionManager,
}

impl TestContext {
    /// Creates a started manager listening on 127.0.0.1 with an ephemeral port
    pub fn new() -> Self {
        init_tracing();
        let mut manager = SessionManager::new();
        manager.register_probe(hot_loop_probe());
        manager
            .enable_remote_session("127.0.0.1", 0)
            .expect("Failed to enable remote session");
        manager.start().expect("Failed to start session manager");
        Self { manager }
    }

    /// Creates a started manager without a remote session
    #[allow(dead_code)]
    pub fn local_only() -> Self {
        init_tracing();
        let mut manager = SessionManager::new();
        manager.register_probe(hot_loop_probe());
        manager.start().expect("Failed to start session manager");
        Self { manager }
    }

    /// Connects a controller to the manager's listener. The connection sits in the
    /// backlog until the manager polls.
    #[allow(dead_code)]
    pub fn connect(&self) -> TestController {
        TestController::connect(self.manager.listener_port())
    }

    /// Sends one request and polls the manager until its response arrives
    #[allow(dead_code)]
    pub fn request(&mut self, controller: &mut TestController, line: &str) -> Response {
        controller.send(line);
        let manager = &mut self.manager;
        controller
            .recv(|| manager.poll())
            .expect("No response before the deadline")
    }

    /// Polls until `condition` holds or the deadline passes. Returns whether it held.
    #[allow(dead_code)]
    pub fn poll_until(&mut self, condition: impl Fn(&SessionManager) -> bool) -> bool {
        let deadline = Instant::now() + DEADLINE;
        while Instant::now() < deadline {
            self.manager.poll();
            if condition(&self.manager) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        false
    }
}

/// A controller speaking the wire protocol over a plain TCP stream
pub struct TestController {
    stream: TcpStream,
    buffer: Vec<u8>,
}

impl TestController {
    pub fn connect(port: u16) -> Self {
        let stream = TcpStream::connect(("127.0.0.1", port)).expect("Failed to connect");
        stream
            .set_read_timeout(Some(Duration::from_millis(2)))
            .expect("Failed to set read timeout");
        Self {
            stream,
            buffer: Vec::new(),
        }
    }

    /// Writes one request frame
    pub fn send(&mut self, line: &str) {
        let frame = encode_request_frame(line.as_bytes()).expect("Failed to frame request");
        self.send_raw(&frame);
    }

    /// Writes raw bytes, e.g. a partial or malformed frame
    pub fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).expect("Failed to write");
        self.stream.flush().expect("Failed to flush");
    }

    /// Polls until a complete response frame has been read. Returns `None` if the
    /// deadline passes or the connection closes first.
    pub fn recv(&mut self, mut poll: impl FnMut()) -> Option<Response> {
        let deadline = Instant::now() + DEADLINE;
        while Instant::now() < deadline {
            if let Some(response) = self.take_response() {
                return Some(response);
            }
            poll();
            match self.read_some() {
                ReadResult::Closed => return self.take_response(),
                ReadResult::Data | ReadResult::Nothing => {}
            }
        }
        None
    }

    /// Polls `attempts` times and returns whatever response arrived, if any.
    #[allow(dead_code)]
    pub fn recv_for(&mut self, attempts: usize, mut poll: impl FnMut()) -> Option<Response> {
        for _ in 0..attempts {
            poll();
            if let ReadResult::Closed = self.read_some() {
                break;
            }
        }
        self.take_response()
    }

    /// Polls until the server closes the connection. Returns whether it did.
    #[allow(dead_code)]
    pub fn wait_closed(&mut self, mut poll: impl FnMut()) -> bool {
        let deadline = Instant::now() + DEADLINE;
        while Instant::now() < deadline {
            poll();
            if let ReadResult::Closed = self.read_some() {
                return true;
            }
        }
        false
    }

    fn read_some(&mut self) -> ReadResult {
        let mut chunk = [0u8; 1024];
        match self.stream.read(&mut chunk) {
            Ok(0) => ReadResult::Closed,
            Ok(n) => {
                self.buffer.extend_from_slice(&chunk[..n]);
                ReadResult::Data
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                ReadResult::Nothing
            }
            Err(_) => ReadResult::Closed,
        }
    }

    fn take_response(&mut self) -> Option<Response> {
        if self.buffer.len() < HEADER_LEN {
            return None;
        }
        let header = std::str::from_utf8(&self.buffer[..HEADER_LEN]).expect("Non-UTF-8 header");
        let len: usize = header.parse().expect("Non-numeric header");
        if self.buffer.len() < HEADER_LEN + len {
            return None;
        }
        let frame: Vec<u8> = self.buffer.drain(..HEADER_LEN + len).collect();
        Some(Response::parse(&frame[HEADER_LEN..]).expect("Malformed response body"))
    }

    /// Bytes received but not yet consumed as a response
    #[allow(dead_code)]
    pub fn raw_buffer(&self) -> &[u8] {
        &self.buffer
    }
}

enum ReadResult {
    Data,
    Nothing,
    Closed,
}
