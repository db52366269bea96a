//! Capture session controller.
//!
//! Mediates between a capture source's events and the prediction service,
//! and manages recovery after a failed attempt:
//! - Success: the service's response is stored pretty-printed for display
//! - Failure: the error payload is stored, the modal opens, and the next
//!   `reset` bumps the remount token so the capture source gets recreated
//!
//! The controller owns the whole session state; nothing else mutates it.

use crate::capture::CaptureError;
use crate::predict::PredictService;

/// Events a capture source delivers, at most once per attempt.
///
/// Any capture-providing collaborator drives the session through this
/// interface; the controller never depends on a concrete source.
pub trait CaptureEvents {
    /// A frame was captured successfully. `image` is the encoded frame.
    fn on_capture_success(&mut self, image: &[u8]);

    /// The capture device failed. Diagnostic only; the session state is
    /// untouched and the current attempt can simply be repeated.
    fn on_capture_error(&mut self, error: &CaptureError);
}

/// The three observable states of a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No result shown; ready for a capture attempt
    Idle,
    /// A successful prediction is displayed
    ResultShown,
    /// A failed prediction is displayed in the modal
    ErrorShown,
}

/// View-level state holder for one capture-and-classify session.
///
/// The cycle repeats for the lifetime of the process:
/// Idle -> ResultShown | ErrorShown -> (reset) -> Idle.
/// Failures are terminal for the attempt and never retried automatically;
/// only an explicit `reset` returns the session to Idle.
#[derive(Debug)]
pub struct SessionController<S> {
    service: S,
    /// Pretty-printed response or error payload, if any
    display: Option<String>,
    has_error: bool,
    modal_open: bool,
    /// Bumped on every ErrorShown -> Idle recovery; owners of the capture
    /// source recreate it when this changes, since the source is assumed to
    /// hold camera-stream state that must be torn down after an error.
    remount_token: u64,
    /// Previous value of `has_error`, compared on every transition so the
    /// token increments on a true edge and never on a plain re-read.
    was_error: bool,
}

impl<S: PredictService> SessionController<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            display: None,
            has_error: false,
            modal_open: false,
            remount_token: 0,
            was_error: false,
        }
    }

    /// Current tri-state, derived from the stored flags.
    pub fn state(&self) -> SessionState {
        if self.has_error {
            SessionState::ErrorShown
        } else if self.display.is_some() {
            SessionState::ResultShown
        } else {
            SessionState::Idle
        }
    }

    /// Text the presentation layer should render, if any.
    pub fn display_text(&self) -> Option<&str> {
        self.display.as_deref()
    }

    /// Whether the last attempt failed.
    pub fn has_error(&self) -> bool {
        self.has_error
    }

    /// Whether the error modal is open.
    pub fn is_modal_open(&self) -> bool {
        self.modal_open
    }

    /// Opaque counter; a change means the capture source must be recreated.
    pub fn remount_token(&self) -> u64 {
        self.remount_token
    }

    /// Clear display text and error state and close the modal. Idempotent.
    ///
    /// Recovering from an error (and only that) bumps the remount token.
    pub fn reset(&mut self) {
        self.display = None;
        self.has_error = false;
        self.modal_open = false;
        self.note_transition();
    }

    /// Edge detection on the error flag: increment the remount token iff the
    /// session just left the error state.
    fn note_transition(&mut self) {
        if self.was_error && !self.has_error {
            self.remount_token += 1;
        }
        self.was_error = self.has_error;
    }
}

impl<S: PredictService> CaptureEvents for SessionController<S> {
    fn on_capture_success(&mut self, image: &[u8]) {
        match self.service.predict(image) {
            Ok(data) => {
                self.display = Some(
                    serde_json::to_string_pretty(&data).unwrap_or_else(|_| data.to_string()),
                );
            }
            Err(err) => {
                tracing::debug!(error = %err, "prediction failed");
                self.has_error = true;
                self.modal_open = true;
                self.display = Some(err.display_payload());
            }
        }
        self.note_transition();
    }

    fn on_capture_error(&mut self, error: &CaptureError) {
        // Device-level errors are non-fatal to the session state; the
        // attempt can simply be repeated.
        tracing::warn!(error = %error, "capture device error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::{PredictError, PredictResult};
    use pretty_assertions::assert_eq;

    /// Stub service returning a canned response per call.
    struct StubService {
        outcome: fn() -> PredictResult<serde_json::Value>,
    }

    impl PredictService for StubService {
        fn predict(&self, _image: &[u8]) -> PredictResult<serde_json::Value> {
            (self.outcome)()
        }
    }

    fn ok_cat() -> PredictResult<serde_json::Value> {
        Ok(serde_json::json!({"label": "cat"}))
    }

    fn reject_invalid_image() -> PredictResult<serde_json::Value> {
        Err(PredictError::Service {
            status: 422,
            payload: serde_json::Value::String("invalid image".to_string()),
        })
    }

    fn reject_structured() -> PredictResult<serde_json::Value> {
        Err(PredictError::Service {
            status: 400,
            payload: serde_json::json!({"error": "no face detected"}),
        })
    }

    fn controller(outcome: fn() -> PredictResult<serde_json::Value>) -> SessionController<StubService> {
        SessionController::new(StubService { outcome })
    }

    #[test]
    fn test_initial_state_is_idle() {
        let c = controller(ok_cat);
        assert_eq!(c.state(), SessionState::Idle);
        assert_eq!(c.display_text(), None);
        assert!(!c.has_error());
        assert!(!c.is_modal_open());
        assert_eq!(c.remount_token(), 0);
    }

    #[test]
    fn test_success_shows_pretty_printed_response() {
        let mut c = controller(ok_cat);
        c.on_capture_success(b"png");

        assert_eq!(c.state(), SessionState::ResultShown);
        assert_eq!(c.display_text(), Some("{\n  \"label\": \"cat\"\n}"));
        assert!(!c.has_error());
        assert!(!c.is_modal_open());
    }

    #[test]
    fn test_failure_with_string_payload_is_verbatim() {
        let mut c = controller(reject_invalid_image);
        c.on_capture_success(b"png");

        assert_eq!(c.state(), SessionState::ErrorShown);
        assert_eq!(c.display_text(), Some("invalid image"));
        assert!(c.has_error());
        assert!(c.is_modal_open());
    }

    #[test]
    fn test_failure_with_structured_payload_is_pretty_printed() {
        let mut c = controller(reject_structured);
        c.on_capture_success(b"png");

        assert_eq!(
            c.display_text(),
            Some("{\n  \"error\": \"no face detected\"\n}")
        );
        assert!(c.has_error());
    }

    #[test]
    fn test_transport_failure_shows_error_message() {
        fn refuse() -> PredictResult<serde_json::Value> {
            Err(PredictError::ConnectionFailed("refused".to_string()))
        }
        let mut c = controller(refuse);
        c.on_capture_success(b"png");

        assert_eq!(c.state(), SessionState::ErrorShown);
        assert_eq!(c.display_text(), Some("Connection failed: refused"));
    }

    #[test]
    fn test_reset_returns_to_idle_from_any_state() {
        let mut c = controller(ok_cat);
        c.on_capture_success(b"png");
        c.reset();
        assert_eq!(c.state(), SessionState::Idle);
        assert_eq!(c.display_text(), None);

        let mut c = controller(reject_invalid_image);
        c.on_capture_success(b"png");
        c.reset();
        assert_eq!(c.state(), SessionState::Idle);
        assert_eq!(c.display_text(), None);
        assert!(!c.has_error());
        assert!(!c.is_modal_open());
    }

    #[test]
    fn test_remount_token_increments_once_on_error_recovery() {
        let mut c = controller(reject_invalid_image);
        c.on_capture_success(b"png");
        assert_eq!(c.remount_token(), 0);

        c.reset();
        assert_eq!(c.remount_token(), 1);

        // Idempotent: a second reset is not another edge
        c.reset();
        assert_eq!(c.remount_token(), 1);
    }

    #[test]
    fn test_remount_token_unchanged_on_success_reset() {
        let mut c = controller(ok_cat);
        c.on_capture_success(b"png");
        c.reset();
        assert_eq!(c.remount_token(), 0);
    }

    #[test]
    fn test_remount_token_counts_each_recovery() {
        let mut c = controller(reject_invalid_image);
        for expected in 1..=3 {
            c.on_capture_success(b"png");
            c.reset();
            assert_eq!(c.remount_token(), expected);
        }
    }

    #[test]
    fn test_device_error_does_not_touch_state() {
        let mut c = controller(ok_cat);
        c.on_capture_error(&CaptureError::Device("stream stalled".to_string()));

        assert_eq!(c.state(), SessionState::Idle);
        assert_eq!(c.display_text(), None);
        assert!(!c.has_error());
        assert_eq!(c.remount_token(), 0);
    }
}
