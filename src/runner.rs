//! Types and driver for capture attempts.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::capture::CaptureSource;
use crate::controller::{CaptureEvents, SessionController};
use crate::predict::PredictService;
use crate::session::Session;

/// Result of a single capture attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// Attempt number (1-based)
    pub attempt: usize,

    /// Path to the captured frame (None when the device failed)
    pub frame_path: Option<PathBuf>,

    /// Display text after the attempt (pretty response or error payload)
    pub display: Option<String>,

    /// Whether the attempt left the session in the error state
    pub error: bool,

    /// Remount token after the attempt
    pub remount_token: u64,
}

/// Result of a complete session run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Whether the run completed (individual attempts may still have failed)
    pub success: bool,

    /// Error message if the run itself aborted
    pub error: Option<String>,

    /// All attempts in order
    pub attempts: Vec<AttemptRecord>,
}

/// Run one capture attempt: grab a frame from the source, feed it through
/// the controller, and persist the frame and response into the session.
///
/// Device-level capture errors are delivered to the controller (which logs
/// them without a state transition) and yield a record with no frame path.
pub fn run_attempt<S: PredictService>(
    source: &mut dyn CaptureSource,
    controller: &mut SessionController<S>,
    session: &Session,
    attempt: usize,
) -> std::io::Result<AttemptRecord> {
    let frame_path = match source.capture() {
        Ok(frame) => {
            let path = session.frame_path(attempt);
            std::fs::write(&path, &frame.image_data)?;

            controller.on_capture_success(&frame.image_data);

            if let Some(text) = controller.display_text() {
                std::fs::write(session.response_path(attempt), text)?;
            }
            Some(path)
        }
        Err(err) => {
            controller.on_capture_error(&err);
            None
        }
    };

    Ok(AttemptRecord {
        attempt,
        frame_path,
        display: controller.display_text().map(str::to_string),
        error: controller.has_error(),
        remount_token: controller.remount_token(),
    })
}
