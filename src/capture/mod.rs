pub mod source;
pub mod types;

#[cfg(target_os = "linux")]
pub mod v4l2;

pub use source::{CaptureSource, MockCamera};
pub use types::{CaptureError, CaptureOutcome, Frame};

#[cfg(target_os = "linux")]
pub use v4l2::V4l2Camera;
