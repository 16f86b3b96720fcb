//! Reconciler push behavior against a mock backend slot store.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use lotwatch::backend::BackendClient;
use lotwatch::error::LotError;

/// One recorded request: method, path, body.
type Recorded = (String, String, String);

struct MockBackend {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<Recorded>>>,
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl MockBackend {
    /// Serve `GET /api/slots` with the given JSON body and acknowledge every
    /// `PUT /api/slots/{id}`, recording all requests.
    fn spawn(slots_json: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock backend");
        let addr = listener.local_addr().expect("local addr");
        listener.set_nonblocking(true).expect("nonblocking");

        let requests: Arc<Mutex<Vec<Recorded>>> = Arc::new(Mutex::new(Vec::new()));
        let shutdown = Arc::new(AtomicBool::new(false));

        let thread_requests = requests.clone();
        let thread_shutdown = shutdown.clone();
        let join = std::thread::spawn(move || loop {
            if thread_shutdown.load(Ordering::SeqCst) {
                break;
            }
            match listener.accept() {
                Ok((stream, _)) => {
                    handle_mock_connection(stream, slots_json, &thread_requests);
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(_) => break,
            }
        });

        Self {
            addr,
            requests,
            shutdown,
            join: Some(join),
        }
    }

    fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    fn recorded(&self) -> Vec<Recorded> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

fn handle_mock_connection(
    mut stream: TcpStream,
    slots_json: &str,
    requests: &Arc<Mutex<Vec<Recorded>>>,
) {
    let _ = stream.set_nonblocking(false);
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));

    let mut buf = [0u8; 4096];
    let mut data = Vec::new();
    let header_end = loop {
        if let Some(pos) = data.windows(4).position(|window| window == b"\r\n\r\n") {
            break pos;
        }
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => return,
            Ok(n) => data.extend_from_slice(&buf[..n]),
        }
    };

    let header_text = String::from_utf8_lossy(&data[..header_end]).into_owned();
    let mut lines = header_text.split("\r\n");
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let content_length = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = data[header_end + 4..].to_vec();
    while body.len() < content_length {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => body.extend_from_slice(&buf[..n]),
        }
    }
    body.truncate(content_length);

    let response_body = if method == "GET" && path == "/api/slots" {
        slots_json.to_string()
    } else {
        r#"{"success":true}"#.to_string()
    };

    requests.lock().expect("requests lock").push((
        method,
        path,
        String::from_utf8_lossy(&body).into_owned(),
    ));

    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        response_body.len(),
        response_body
    );
    let _ = stream.write_all(response.as_bytes());
}

#[test]
fn fetch_slots_parses_the_data_envelope() {
    let backend = MockBackend::spawn(
        r#"{"data":[{"id":1,"code":"P1","is_occupied":false},{"id":2,"code":"P2","is_occupied":true}]}"#,
    );
    let client = BackendClient::new(backend.base_url());

    let slots = client.fetch_slots().expect("fetch slots");
    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0].code, "P1");
    assert!(!slots[0].is_occupied);
    assert_eq!(slots[1].id, 2);
    assert!(slots[1].is_occupied);
}

#[test]
fn push_writes_only_slots_whose_backend_value_differs() {
    let backend = MockBackend::spawn(
        r#"{"data":[{"id":1,"code":"P1","is_occupied":false},{"id":2,"code":"P2","is_occupied":true}]}"#,
    );
    let client = BackendClient::new(backend.base_url());

    // P1 actually changed, P2 already matches the backend, P3 is unknown to it.
    let changed = vec![
        ("P1".to_string(), true),
        ("P2".to_string(), true),
        ("P3".to_string(), false),
    ];
    let failures = client.push_changes(&changed);
    assert!(failures.is_empty());

    let recorded = backend.recorded();
    let puts: Vec<&Recorded> = recorded
        .iter()
        .filter(|(method, _, _)| method == "PUT")
        .collect();
    assert_eq!(puts.len(), 1, "only the genuinely changed slot is written");
    assert_eq!(puts[0].1, "/api/slots/1");
    let body: serde_json::Value = serde_json::from_str(&puts[0].2).expect("put body");
    assert_eq!(body["is_occupied"], true);
}

#[test]
fn empty_diff_pushes_nothing() {
    let backend = MockBackend::spawn(r#"{"data":[{"id":1,"code":"P1","is_occupied":false}]}"#);
    let client = BackendClient::new(backend.base_url());

    let failures = client.push_changes(&[]);
    assert!(failures.is_empty());
    assert!(backend.recorded().is_empty());
}

#[test]
fn unreachable_backend_reports_every_region_without_panicking() {
    // Grab a port, then release it so nothing is listening there.
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let client = BackendClient::new(format!("http://{}", addr));
    assert!(matches!(
        client.fetch_slots(),
        Err(LotError::BackendUnreachable(_))
    ));

    let changed = vec![("P1".to_string(), true), ("P2".to_string(), false)];
    let failures = client.push_changes(&changed);
    assert_eq!(failures.len(), 2);
    let codes: Vec<&str> = failures.iter().map(|(code, _)| code.as_str()).collect();
    assert_eq!(codes, vec!["P1", "P2"]);
}
