//! Configuration management with environment variable support.
//!
//! This module provides centralized configuration for Face Vision, supporting:
//! - Environment variables for all configurable values
//! - Sensible defaults for local development
//! - Builder pattern for programmatic configuration
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `FACE_VISION_ENDPOINT` | Prediction service endpoint URL | `http://127.0.0.1:8080/predict` |
//! | `FACE_VISION_CONNECT_TIMEOUT` | Connection timeout in seconds | `10` |
//! | `FACE_VISION_REQUEST_TIMEOUT` | Whole-request timeout in seconds | `60` |
//! | `FACE_VISION_SESSION_DIR` | Base directory for sessions | `/tmp/face-vision` |
//! | `FACE_VISION_DEVICE` | V4L2 camera device path | `/dev/video0` |
//! | `FACE_VISION_CAPTURE_SIZE` | Capture resolution preset or WxH | `vga` |
//! | `FACE_VISION_WARMUP_FRAMES` | Frames discarded before capture | `3` |
//!
//! # Example
//!
//! ```bash
//! # Point at a remote prediction service
//! export FACE_VISION_ENDPOINT="http://10.0.0.5:5000/predict"
//!
//! # Capture in HD from the second camera
//! export FACE_VISION_DEVICE="/dev/video2"
//! export FACE_VISION_CAPTURE_SIZE="hd"
//! ```

use std::env;
use std::sync::OnceLock;

// ============================================================================
// Default Values
// ============================================================================

/// Default prediction service endpoint
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8080/predict";

/// Default connection timeout (seconds)
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 10;

/// Default whole-request timeout (seconds)
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 60;

/// Default session base directory
pub const DEFAULT_SESSION_DIR: &str = "/tmp/face-vision";

/// Default V4L2 camera device path
pub const DEFAULT_DEVICE: &str = "/dev/video0";

/// Default capture size preset
pub const DEFAULT_CAPTURE_SIZE: &str = "vga";

/// Default capture width (pixels)
pub const DEFAULT_CAPTURE_WIDTH: u32 = 640;

/// Default capture height (pixels)
pub const DEFAULT_CAPTURE_HEIGHT: u32 = 480;

/// Default number of warm-up frames discarded before the real capture
pub const DEFAULT_WARMUP_FRAMES: u32 = 3;

// ============================================================================
// Environment Variable Names
// ============================================================================

/// Environment variable for the prediction endpoint
pub const ENV_ENDPOINT: &str = "FACE_VISION_ENDPOINT";

/// Environment variable for the connection timeout
pub const ENV_CONNECT_TIMEOUT: &str = "FACE_VISION_CONNECT_TIMEOUT";

/// Environment variable for the request timeout
pub const ENV_REQUEST_TIMEOUT: &str = "FACE_VISION_REQUEST_TIMEOUT";

/// Environment variable for the session directory
pub const ENV_SESSION_DIR: &str = "FACE_VISION_SESSION_DIR";

/// Environment variable for the camera device path
pub const ENV_DEVICE: &str = "FACE_VISION_DEVICE";

/// Environment variable for the capture size
pub const ENV_CAPTURE_SIZE: &str = "FACE_VISION_CAPTURE_SIZE";

/// Environment variable for the warm-up frame count
pub const ENV_WARMUP_FRAMES: &str = "FACE_VISION_WARMUP_FRAMES";

// ============================================================================
// Configuration Getters (with caching)
// ============================================================================

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration (initialized from environment on first access)
pub fn get() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Centralized configuration for Face Vision
#[derive(Debug, Clone)]
pub struct Config {
    /// Prediction service configuration
    pub predict: PredictSettings,
    /// Session configuration
    pub session: SessionSettings,
    /// Camera capture configuration
    pub capture: CaptureSettings,
}

/// Prediction-service-related settings
#[derive(Debug, Clone)]
pub struct PredictSettings {
    /// Endpoint URL
    pub endpoint: String,
    /// Connection timeout (seconds)
    pub connect_timeout: u64,
    /// Whole-request timeout (seconds)
    pub request_timeout: u64,
}

/// Session-related settings
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Base directory for session storage
    pub base_dir: String,
}

/// Camera-capture-related settings
#[derive(Debug, Clone)]
pub struct CaptureSettings {
    /// V4L2 device path
    pub device: String,
    /// Capture size preset name (or "WxH")
    pub size: String,
    /// Capture width in pixels
    pub width: u32,
    /// Capture height in pixels
    pub height: u32,
    /// Frames discarded before the real capture (auto-exposure settling)
    pub warmup_frames: u32,
}

impl Config {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            predict: PredictSettings::from_env(),
            session: SessionSettings::from_env(),
            capture: CaptureSettings::from_env(),
        }
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            predict: PredictSettings::defaults(),
            session: SessionSettings::defaults(),
            capture: CaptureSettings::defaults(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl PredictSettings {
    /// Create prediction settings from environment variables
    pub fn from_env() -> Self {
        Self {
            endpoint: env::var(ENV_ENDPOINT).unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string()),
            connect_timeout: env::var(ENV_CONNECT_TIMEOUT)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            request_timeout: env::var(ENV_REQUEST_TIMEOUT)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
        }
    }

    /// Create prediction settings with defaults
    pub fn defaults() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl SessionSettings {
    /// Create session settings from environment variables
    pub fn from_env() -> Self {
        Self {
            base_dir: env::var(ENV_SESSION_DIR).unwrap_or_else(|_| DEFAULT_SESSION_DIR.to_string()),
        }
    }

    /// Create session settings with defaults
    pub fn defaults() -> Self {
        Self {
            base_dir: DEFAULT_SESSION_DIR.to_string(),
        }
    }
}

impl CaptureSettings {
    /// Create capture settings from environment variables
    pub fn from_env() -> Self {
        let size = env::var(ENV_CAPTURE_SIZE).unwrap_or_else(|_| DEFAULT_CAPTURE_SIZE.to_string());

        // Parse the size to get pixel dimensions
        let (width, height) = parse_capture_size(&size)
            .unwrap_or((DEFAULT_CAPTURE_WIDTH, DEFAULT_CAPTURE_HEIGHT));

        Self {
            device: env::var(ENV_DEVICE).unwrap_or_else(|_| DEFAULT_DEVICE.to_string()),
            size,
            width,
            height,
            warmup_frames: env::var(ENV_WARMUP_FRAMES)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_WARMUP_FRAMES),
        }
    }

    /// Create capture settings with hardcoded defaults
    pub fn defaults() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_string(),
            size: DEFAULT_CAPTURE_SIZE.to_string(),
            width: DEFAULT_CAPTURE_WIDTH,
            height: DEFAULT_CAPTURE_HEIGHT,
            warmup_frames: DEFAULT_WARMUP_FRAMES,
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Parse a capture size string into (width, height)
/// Supports: "qvga" (320x240), "vga" (640x480), "hd" (1280x720), "fhd" (1920x1080), or "WxH"
pub fn parse_capture_size(size: &str) -> Option<(u32, u32)> {
    match size.to_lowercase().as_str() {
        "qvga" => Some((320, 240)),
        "vga" => Some((640, 480)),
        "hd" => Some((1280, 720)),
        "fhd" => Some((1920, 1080)),
        custom => {
            let parts: Vec<&str> = custom.split('x').collect();
            if parts.len() == 2 {
                let w = parts[0].parse().ok()?;
                let h = parts[1].parse().ok()?;
                Some((w, h))
            } else {
                None
            }
        }
    }
}

/// Get the prediction endpoint from environment (convenience function)
pub fn endpoint() -> String {
    get().predict.endpoint.clone()
}

/// Get the session base directory (convenience function)
pub fn session_base_dir() -> String {
    get().session.base_dir.clone()
}

/// Get the camera device path (convenience function)
pub fn camera_device() -> String {
    get().capture.device.clone()
}
