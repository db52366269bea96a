//! Face Vision - webcam face capture with prediction service classification.
//!
//! This crate provides:
//! - A capture session controller (idle / result / error, with remount-driven
//!   recovery after failed predictions)
//! - Capture sources: V4L2 webcams (linux) and a mock camera for testing
//! - A prediction service client posting captured frames as JSON
//! - Session management for organized temp files
//!
//! # Example
//!
//! ```rust,no_run
//! use face_vision::capture::{CaptureSource, MockCamera};
//! use face_vision::controller::{CaptureEvents, SessionController};
//! use face_vision::predict::{HttpPredictClient, PredictConfig};
//!
//! let client = HttpPredictClient::new(PredictConfig::new("http://127.0.0.1:8080/predict"));
//! let mut controller = SessionController::new(client);
//!
//! let mut camera = MockCamera::synthetic_face(640, 480);
//! let frame = camera.capture().unwrap();
//! controller.on_capture_success(&frame.image_data);
//! println!("{}", controller.display_text().unwrap_or("no result"));
//! ```

pub mod capture;
pub mod config;
pub mod controller;
pub mod predict;
pub mod runner;
pub mod session;

// Re-export controller types
pub use controller::{CaptureEvents, SessionController, SessionState};

// Re-export capture types and sources
pub use capture::{CaptureError, CaptureOutcome, CaptureSource, Frame, MockCamera};

#[cfg(target_os = "linux")]
pub use capture::V4l2Camera;

// Re-export prediction client
pub use predict::{
    HttpPredictClient, PredictConfig, PredictError, PredictResult, PredictService, check_health,
};

// Re-export run types
pub use runner::{AttemptRecord, RunReport, run_attempt};

// Re-export session management
pub use session::{
    Session, cleanup_old_sessions, cleanup_old_sessions_in, list_sessions, list_sessions_in,
};
