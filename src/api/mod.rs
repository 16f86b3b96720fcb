//! HTTP service surface.
//!
//! A small server over `std::net::TcpListener`: one worker thread,
//! non-blocking accept with a shutdown flag, one connection handled at a
//! time. Connections are not kept alive; every response closes. Concurrent
//! analyses cannot interleave: handling is serialized here and the service
//! lock enforces the same invariant independently.
//!
//! Routes:
//! - `GET  /health`   service and model status
//! - `POST /analyze`  raw image bytes in, occupancy out
//! - `GET  /regions`  current region list
//! - `POST /regions`  validate and replace the region list
//! - `GET  /overlay`  regions merged with latest occupancy

use std::collections::{BTreeMap, HashMap};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::error::LotError;
use crate::region::Region;
use crate::service::{LastDetection, LotService, OverlayRegion};

const MAX_HEADER_BYTES: usize = 8192;
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub addr: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:5000".to_string(),
        }
    }
}

#[derive(Debug)]
pub struct ApiHandle {
    pub addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl ApiHandle {
    pub fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("api server thread panicked"))?;
        }
        Ok(())
    }
}

pub struct ApiServer {
    cfg: ApiConfig,
    service: Arc<LotService>,
}

impl ApiServer {
    pub fn new(cfg: ApiConfig, service: Arc<LotService>) -> Self {
        Self { cfg, service }
    }

    pub fn spawn(self) -> Result<ApiHandle> {
        let configured_addr: SocketAddr = self.cfg.addr.parse()?;
        let listener = TcpListener::bind(configured_addr)?;
        let addr = listener.local_addr()?;
        if configured_addr.ip().is_loopback() && !addr.ip().is_loopback() {
            return Err(anyhow!(
                "api configured for loopback address '{}', but bound to non-loopback address '{}'",
                configured_addr,
                addr
            ));
        }
        listener.set_nonblocking(true)?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_thread = shutdown.clone();
        let service = self.service;
        let join = std::thread::spawn(move || {
            if let Err(err) = run_api(listener, service, shutdown_thread) {
                log::error!("occupancy api stopped: {}", err);
            }
        });

        Ok(ApiHandle {
            addr,
            shutdown,
            join: Some(join),
        })
    }
}

fn run_api(
    listener: TcpListener,
    service: Arc<LotService>,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        match listener.accept() {
            Ok((stream, _)) => {
                if let Err(err) = handle_connection(stream, &service) {
                    log::warn!("occupancy api request failed: {}", err);
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(50));
                continue;
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    model_loaded: bool,
    regions_loaded: bool,
}

#[derive(Serialize)]
struct AnalyzeResponse {
    success: bool,
    vehicles_detected: usize,
    slot_status: BTreeMap<String, bool>,
    timestamp: Option<String>,
}

#[derive(Serialize)]
struct RegionsResponse {
    success: bool,
    regions: Vec<Region>,
}

#[derive(Deserialize)]
struct SetRegionsRequest {
    regions: Vec<Region>,
}

#[derive(Serialize)]
struct MessageResponse {
    success: bool,
    message: String,
}

#[derive(Serialize)]
struct OverlayResponse {
    success: bool,
    regions: Vec<OverlayRegion>,
    last_detection: LastDetection,
}

fn handle_connection(mut stream: TcpStream, service: &LotService) -> Result<()> {
    let request = read_request(&mut stream)?;
    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/health") => {
            let health = service.health()?;
            let payload = serde_json::to_vec(&HealthResponse {
                status: "ok",
                model_loaded: health.model_loaded,
                regions_loaded: health.regions_loaded,
            })?;
            write_response(&mut stream, 200, "application/json", &payload)
        }
        ("POST", "/analyze") => {
            if request.body.is_empty() {
                return write_json_response(
                    &mut stream,
                    400,
                    r#"{"success":false,"error":"no_image_provided"}"#,
                );
            }
            match service.analyze(&request.body) {
                Ok(outcome) => {
                    let payload = serde_json::to_vec(&AnalyzeResponse {
                        success: true,
                        vehicles_detected: outcome.snapshot.vehicles_detected,
                        slot_status: outcome.snapshot.slot_status,
                        timestamp: outcome.snapshot.timestamp,
                    })?;
                    write_response(&mut stream, 200, "application/json", &payload)
                }
                Err(err) => write_analyze_error(&mut stream, err),
            }
        }
        ("GET", "/regions") => {
            let regions = service.regions()?;
            let payload = serde_json::to_vec(&RegionsResponse {
                success: true,
                regions,
            })?;
            write_response(&mut stream, 200, "application/json", &payload)
        }
        ("POST", "/regions") => {
            let parsed: SetRegionsRequest = match serde_json::from_slice(&request.body) {
                Ok(parsed) => parsed,
                Err(_) => {
                    return write_json_response(
                        &mut stream,
                        400,
                        r#"{"success":false,"error":"no_regions_provided"}"#,
                    )
                }
            };
            match service.set_regions(parsed.regions) {
                Ok(count) => {
                    let payload = serde_json::to_vec(&MessageResponse {
                        success: true,
                        message: format!("saved {} regions", count),
                    })?;
                    write_response(&mut stream, 200, "application/json", &payload)
                }
                Err(err) => match err.downcast_ref::<LotError>() {
                    Some(LotError::InvalidRegion { .. }) => {
                        let payload = serde_json::to_vec(&serde_json::json!({
                            "success": false,
                            "error": err.to_string(),
                        }))?;
                        write_response(&mut stream, 400, "application/json", &payload)
                    }
                    _ => {
                        log::error!("region replacement failed: {:#}", err);
                        write_json_response(
                            &mut stream,
                            500,
                            r#"{"success":false,"error":"region_update_failed"}"#,
                        )
                    }
                },
            }
        }
        ("GET", "/overlay") => {
            let overlay = service.overlay()?;
            let payload = serde_json::to_vec(&OverlayResponse {
                success: true,
                regions: overlay.regions,
                last_detection: overlay.last_detection,
            })?;
            write_response(&mut stream, 200, "application/json", &payload)
        }
        (_, "/health") | (_, "/analyze") | (_, "/regions") | (_, "/overlay") => {
            write_json_response(
                &mut stream,
                405,
                r#"{"success":false,"error":"method_not_allowed"}"#,
            )
        }
        _ => write_json_response(&mut stream, 404, r#"{"success":false,"error":"not_found"}"#),
    }
}

fn write_analyze_error(stream: &mut TcpStream, err: anyhow::Error) -> Result<()> {
    if matches!(
        err.downcast_ref::<LotError>(),
        Some(LotError::DetectionUnavailable)
    ) {
        return write_json_response(
            stream,
            503,
            r#"{"success":false,"error":"detection_unavailable"}"#,
        );
    }
    if err.downcast_ref::<image::ImageError>().is_some() {
        return write_json_response(stream, 400, r#"{"success":false,"error":"invalid_image"}"#);
    }
    log::error!("analysis failed: {:#}", err);
    write_json_response(stream, 500, r#"{"success":false,"error":"analysis_failed"}"#)
}

#[derive(Debug)]
struct HttpRequest {
    method: String,
    path: String,
    body: Vec<u8>,
}

fn read_request(stream: &mut TcpStream) -> Result<HttpRequest> {
    // The accept loop runs non-blocking; individual connections are handled
    // blocking with a read deadline.
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(Duration::from_secs(5)))?;

    let mut buf = [0u8; 4096];
    let mut data = Vec::new();
    let header_end = loop {
        if let Some(pos) = data.windows(4).position(|window| window == b"\r\n\r\n") {
            break pos;
        }
        if data.len() > MAX_HEADER_BYTES {
            return Err(anyhow!("request header too large"));
        }
        let n = stream.read(&mut buf)?;
        if n == 0 {
            return Err(anyhow!("connection closed mid-request"));
        }
        data.extend_from_slice(&buf[..n]);
    };

    let header_text = String::from_utf8_lossy(&data[..header_end]).into_owned();
    let mut lines = header_text.split("\r\n");
    let request_line = lines.next().ok_or_else(|| anyhow!("empty request"))?;
    let mut parts = request_line.split_whitespace();
    let method = parts
        .next()
        .ok_or_else(|| anyhow!("missing method"))?
        .to_string();
    let raw_path = parts.next().ok_or_else(|| anyhow!("missing path"))?;

    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        if let Some((key, value)) = line.split_once(':') {
            headers.insert(key.trim().to_lowercase(), value.trim().to_string());
        }
    }

    let content_length = headers
        .get("content-length")
        .map(|value| value.parse::<usize>())
        .transpose()
        .map_err(|_| anyhow!("invalid content-length"))?
        .unwrap_or(0);
    if content_length > MAX_BODY_BYTES {
        return Err(anyhow!("request body too large"));
    }

    let mut body = data[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            return Err(anyhow!("connection closed mid-body"));
        }
        body.extend_from_slice(&buf[..n]);
    }
    body.truncate(content_length);

    let path = raw_path.split('?').next().unwrap_or(raw_path).to_string();
    Ok(HttpRequest { method, path, body })
}

fn write_json_response(stream: &mut TcpStream, status: u16, body: &str) -> Result<()> {
    write_response(stream, status, "application/json", body.as_bytes())
}

fn write_response(
    stream: &mut TcpStream,
    status: u16,
    content_type: &str,
    body: &[u8],
) -> Result<()> {
    let status_line = match status {
        200 => "HTTP/1.1 200 OK",
        400 => "HTTP/1.1 400 Bad Request",
        404 => "HTTP/1.1 404 Not Found",
        405 => "HTTP/1.1 405 Method Not Allowed",
        503 => "HTTP/1.1 503 Service Unavailable",
        _ => "HTTP/1.1 500 Internal Server Error",
    };
    let header = format!(
        "{status_line}\r\nContent-Type: {content_type}\r\nContent-Length: {len}\r\nCache-Control: no-store\r\nConnection: close\r\n\r\n",
        status_line = status_line,
        content_type = content_type,
        len = body.len()
    );
    stream.write_all(header.as_bytes())?;
    stream.write_all(body)?;
    Ok(())
}
