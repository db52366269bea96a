//! Prediction service client.
//!
//! Provides the HTTP communication with the face classification backend:
//! - `PredictService` trait - the seam the session controller talks through
//! - `HttpPredictClient` - JSON POST of the captured frame, bounded timeouts
//! - Connection health checks
//!
//! # Configuration
//!
//! Client settings can be configured via environment variables:
//! - `FACE_VISION_ENDPOINT`: prediction endpoint URL
//! - `FACE_VISION_CONNECT_TIMEOUT`: connection timeout (seconds)
//! - `FACE_VISION_REQUEST_TIMEOUT`: whole-request timeout (seconds)

use base64::Engine;
use std::process::Command;
use std::time::Duration;

use crate::config;

/// Result type for prediction operations
pub type PredictResult<T> = Result<T, PredictError>;

/// Errors that can occur while talking to the prediction service
#[derive(Debug)]
pub enum PredictError {
    /// Failed to connect to the prediction endpoint
    ConnectionFailed(String),
    /// The request exceeded the configured timeout
    Timeout(Duration),
    /// The service answered with a non-2xx status; `payload` is the decoded
    /// response body (JSON value, or a string when the body was not JSON)
    Service {
        status: u16,
        payload: serde_json::Value,
    },
    /// The service answered but the response could not be interpreted
    InvalidResponse(String),
    /// IO error
    Io(std::io::Error),
}

impl PredictError {
    /// The text a user should see for this failure.
    ///
    /// Structured service payloads are pretty-printed; plain-string payloads
    /// are passed through verbatim. Transport errors carry no payload and
    /// render their own message.
    pub fn display_payload(&self) -> String {
        match self {
            PredictError::Service { payload, .. } => format_payload(payload),
            other => other.to_string(),
        }
    }
}

impl std::fmt::Display for PredictError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PredictError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            PredictError::Timeout(d) => write!(f, "No response for {:?}", d),
            PredictError::Service { status, .. } => {
                write!(f, "Prediction service returned status {}", status)
            }
            PredictError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
            PredictError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for PredictError {}

impl From<std::io::Error> for PredictError {
    fn from(e: std::io::Error) -> Self {
        PredictError::Io(e)
    }
}

/// Render a service payload as display text: verbatim for plain strings,
/// pretty-printed JSON for anything structured.
pub fn format_payload(payload: &serde_json::Value) -> String {
    match payload {
        serde_json::Value::String(s) => s.clone(),
        other => {
            serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string())
        }
    }
}

/// Configuration for the prediction client
#[derive(Debug, Clone)]
pub struct PredictConfig {
    /// Endpoint URL
    pub endpoint: String,
    /// Timeout for the initial connection (seconds)
    pub connect_timeout: u64,
    /// Timeout for the whole request (seconds)
    pub request_timeout: u64,
}

impl Default for PredictConfig {
    fn default() -> Self {
        let cfg = config::get();
        Self {
            endpoint: cfg.predict.endpoint.clone(),
            connect_timeout: cfg.predict.connect_timeout,
            request_timeout: cfg.predict.request_timeout,
        }
    }
}

impl PredictConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    pub fn connect_timeout(mut self, seconds: u64) -> Self {
        self.connect_timeout = seconds;
        self
    }

    pub fn request_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout = seconds;
        self
    }
}

/// Capability the session controller requires from a prediction backend.
///
/// `image` is an encoded image (PNG in this crate). A successful prediction
/// yields the decoded JSON response body.
pub trait PredictService {
    fn predict(&self, image: &[u8]) -> PredictResult<serde_json::Value>;
}

/// HTTP client for the prediction service
#[derive(Debug, Clone, Default)]
pub struct HttpPredictClient {
    config: PredictConfig,
}

impl HttpPredictClient {
    pub fn new(config: PredictConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PredictConfig {
        &self.config
    }
}

impl PredictService for HttpPredictClient {
    fn predict(&self, image: &[u8]) -> PredictResult<serde_json::Value> {
        let img_base64 = base64::engine::general_purpose::STANDARD.encode(image);

        let request = serde_json::json!({
            "image": format!("data:image/png;base64,{}", img_base64),
        });
        let request_json = serde_json::to_string(&request)
            .map_err(|e| PredictError::InvalidResponse(e.to_string()))?;

        // Scratch files on both sides of the request: the encoded frame
        // makes the body far larger than the kernel allows for a single
        // exec argument, so curl reads it from a file, and the response
        // body goes to a file so stdout carries only the status code
        // from --write-out.
        let tag = format!("{}-{}", std::process::id(), chrono::Utc::now().timestamp_millis());
        let request_path = std::env::temp_dir().join(format!("face-vision-request-{}.json", tag));
        let body_path = std::env::temp_dir().join(format!("face-vision-response-{}.json", tag));

        std::fs::write(&request_path, &request_json)?;

        tracing::debug!(endpoint = %self.config.endpoint, bytes = image.len(), "posting frame");

        let output = Command::new("curl")
            .args([
                "-s",
                "-X", "POST",
                &self.config.endpoint,
                "-H", "Content-Type: application/json",
                "--data-binary", &format!("@{}", request_path.display()),
                "-o", &body_path.to_string_lossy(),
                "-w", "%{http_code}",
                "--connect-timeout", &self.config.connect_timeout.to_string(),
                "--max-time", &self.config.request_timeout.to_string(),
            ])
            .output();

        let _ = std::fs::remove_file(&request_path);
        let output = output?;

        let body = std::fs::read_to_string(&body_path).unwrap_or_default();
        let _ = std::fs::remove_file(&body_path);

        if !output.status.success() {
            // curl exit code 28 is a timeout; everything else is a transport failure
            if output.status.code() == Some(28) {
                return Err(PredictError::Timeout(Duration::from_secs(
                    self.config.request_timeout,
                )));
            }
            return Err(PredictError::ConnectionFailed(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }

        let status: u16 = String::from_utf8_lossy(&output.stdout).trim().parse().unwrap_or(0);
        if status == 0 {
            return Err(PredictError::ConnectionFailed(format!(
                "no response from {}",
                self.config.endpoint
            )));
        }

        let payload = parse_body(&body);

        if (200..300).contains(&status) {
            tracing::debug!(status, "prediction succeeded");
            Ok(payload)
        } else {
            tracing::debug!(status, "prediction rejected");
            Err(PredictError::Service { status, payload })
        }
    }
}

/// Decode a response body: JSON when it parses, plain string otherwise.
fn parse_body(body: &str) -> serde_json::Value {
    serde_json::from_str(body)
        .unwrap_or_else(|_| serde_json::Value::String(body.trim_end_matches('\n').to_string()))
}

/// Check if the prediction endpoint is reachable (connection-only check).
///
/// This only verifies the server accepts connections - it doesn't issue a
/// real prediction since those carry a full image payload.
pub fn check_health(endpoint: &str, timeout_secs: u64) -> PredictResult<bool> {
    // Extract host:port from the endpoint URL for the connection test
    let url = endpoint.trim_start_matches("http://").trim_start_matches("https://");
    let host_port = url.split('/').next().unwrap_or("127.0.0.1:8080");

    let output = Command::new("curl")
        .args([
            "-s",
            "-o", "/dev/null",
            "-w", "%{http_code}",
            "--connect-timeout", &timeout_secs.to_string(),
            "--max-time", &timeout_secs.to_string(),
            "-I",
            &format!("http://{}", host_port),
        ])
        .output()?;

    let status = String::from_utf8_lossy(&output.stdout);
    // Any response (even 4xx/5xx) means the server is reachable;
    // 000 means the connection failed entirely
    let code: u16 = status.trim().parse().unwrap_or(0);
    Ok(code > 0)
}
