//! Capture source abstraction.
//!
//! This module provides a unified interface over the ways a frame can be
//! produced:
//! - V4L2 webcam capture (linux, see `capture::v4l2`)
//! - MockCamera (testing and the `mock` CLI command)

use image::{ImageBuffer, RgbImage};
use std::io::Cursor;

use super::types::{CaptureError, CaptureOutcome, Frame};

/// Trait for capture sources
///
/// Implementations provide different ways of producing a frame:
/// - `V4l2Camera` for real webcams
/// - `MockCamera` for tests with programmatic drawing
///
/// A source is expected to hold device state; after an error recovery the
/// session loop drops it and constructs a fresh one.
pub trait CaptureSource: Send {
    /// Capture one frame
    fn capture(&mut self) -> CaptureOutcome<Frame>;

    /// Get the source type identifier (e.g., "v4l2", "mock")
    fn source_type(&self) -> &str;

    /// Get the frame width in pixels
    fn width(&self) -> u32;

    /// Get the frame height in pixels
    fn height(&self) -> u32;
}

/// A virtual camera for testing and demos
///
/// Backed by an RGB framebuffer with a small drawing API:
/// - `fill()` - fill the whole frame with a color
/// - `draw_rect()` - filled rectangle
/// - `draw_disc()` - filled disc, good enough for face-shaped fixtures
/// - `get_pixel()` / `set_pixel()` - direct pixel access
#[derive(Debug, Clone)]
pub struct MockCamera {
    /// Width in pixels
    width: u32,
    /// Height in pixels
    height: u32,
    /// RGB pixel buffer (row-major, 3 bytes per pixel)
    buffer: Vec<u8>,
}

impl MockCamera {
    /// Create a new mock camera with the given dimensions, initialized to black
    pub fn new(width: u32, height: u32) -> Self {
        let buffer = vec![0u8; (width * height * 3) as usize];
        Self {
            width,
            height,
            buffer,
        }
    }

    /// Create a mock camera initialized to a specific color
    pub fn with_color(width: u32, height: u32, color: [u8; 3]) -> Self {
        let mut cam = Self::new(width, height);
        cam.fill(color);
        cam
    }

    /// Create a mock camera showing a crude face-like fixture: a skin-tone
    /// disc on a grey background with two darker discs for eyes.
    pub fn synthetic_face(width: u32, height: u32) -> Self {
        let mut cam = Self::with_color(width, height, [40, 40, 48]);
        let cx = width / 2;
        let cy = height / 2;
        let r = width.min(height) / 3;

        cam.draw_disc(cx, cy, r, [224, 172, 140]);
        cam.draw_disc(cx - r / 2, cy - r / 4, r / 8, [52, 36, 28]);
        cam.draw_disc(cx + r / 2, cy - r / 4, r / 8, [52, 36, 28]);
        cam.draw_rect(cx - r / 3, cy + r / 2, 2 * r / 3, r / 10, [150, 90, 80]);
        cam
    }

    /// Load a frame from PNG image bytes
    pub fn from_png_bytes(data: &[u8]) -> CaptureOutcome<Self> {
        let img = image::load_from_memory(data)
            .map_err(|e| CaptureError::Decode(format!("Failed to load PNG: {}", e)))?;
        let rgb = img.to_rgb8();
        Ok(Self {
            width: rgb.width(),
            height: rgb.height(),
            buffer: rgb.into_raw(),
        })
    }

    /// Fill the entire frame with a color
    pub fn fill(&mut self, color: [u8; 3]) {
        for chunk in self.buffer.chunks_exact_mut(3) {
            chunk[0] = color[0];
            chunk[1] = color[1];
            chunk[2] = color[2];
        }
    }

    /// Draw a filled rectangle
    pub fn draw_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: [u8; 3]) {
        for py in y..(y + h).min(self.height) {
            for px in x..(x + w).min(self.width) {
                self.set_pixel(px, py, color);
            }
        }
    }

    /// Draw a filled disc centered at (cx, cy)
    pub fn draw_disc(&mut self, cx: u32, cy: u32, radius: u32, color: [u8; 3]) {
        let (cx, cy, r) = (cx as i64, cy as i64, radius as i64);
        for py in (cy - r).max(0)..(cy + r + 1).min(self.height as i64) {
            for px in (cx - r).max(0)..(cx + r + 1).min(self.width as i64) {
                let dx = px - cx;
                let dy = py - cy;
                if dx * dx + dy * dy <= r * r {
                    self.set_pixel(px as u32, py as u32, color);
                }
            }
        }
    }

    /// Get the color of a pixel
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        if x >= self.width || y >= self.height {
            return [0, 0, 0];
        }
        let idx = ((y * self.width + x) * 3) as usize;
        [self.buffer[idx], self.buffer[idx + 1], self.buffer[idx + 2]]
    }

    /// Set the color of a pixel
    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = ((y * self.width + x) * 3) as usize;
        self.buffer[idx] = color[0];
        self.buffer[idx + 1] = color[1];
        self.buffer[idx + 2] = color[2];
    }

    /// Get the raw RGB buffer
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Convert to an image buffer
    pub fn to_image(&self) -> RgbImage {
        ImageBuffer::from_raw(self.width, self.height, self.buffer.clone())
            .expect("Buffer size should match dimensions")
    }

    /// Encode the frame as PNG bytes
    pub fn to_png(&self) -> CaptureOutcome<Vec<u8>> {
        let img = self.to_image();
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .map_err(|e| CaptureError::Decode(format!("Failed to encode PNG: {}", e)))?;
        Ok(bytes)
    }
}

impl CaptureSource for MockCamera {
    fn capture(&mut self) -> CaptureOutcome<Frame> {
        let image_data = self.to_png()?;
        Ok(Frame {
            image_data,
            width: self.width,
            height: self.height,
            metadata: Some(serde_json::json!({
                "mock": true
            })),
        })
    }

    fn source_type(&self) -> &str {
        "mock"
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_camera_new() {
        let cam = MockCamera::new(100, 50);
        assert_eq!(cam.width(), 100);
        assert_eq!(cam.height(), 50);
        // Should be initialized to black
        assert_eq!(cam.get_pixel(0, 0), [0, 0, 0]);
        assert_eq!(cam.get_pixel(99, 49), [0, 0, 0]);
    }

    #[test]
    fn test_mock_camera_fill() {
        let mut cam = MockCamera::new(10, 10);
        cam.fill([255, 128, 64]);
        assert_eq!(cam.get_pixel(0, 0), [255, 128, 64]);
        assert_eq!(cam.get_pixel(5, 5), [255, 128, 64]);
        assert_eq!(cam.get_pixel(9, 9), [255, 128, 64]);
    }

    #[test]
    fn test_mock_camera_draw_rect() {
        let mut cam = MockCamera::new(20, 20);
        cam.draw_rect(5, 5, 10, 10, [255, 0, 0]);

        // Outside rect
        assert_eq!(cam.get_pixel(4, 4), [0, 0, 0]);

        // Inside rect
        assert_eq!(cam.get_pixel(5, 5), [255, 0, 0]);
        assert_eq!(cam.get_pixel(14, 14), [255, 0, 0]);

        // Just outside rect
        assert_eq!(cam.get_pixel(15, 15), [0, 0, 0]);
    }

    #[test]
    fn test_mock_camera_draw_disc() {
        let mut cam = MockCamera::new(40, 40);
        cam.draw_disc(20, 20, 10, [0, 255, 0]);

        // Center and a point inside
        assert_eq!(cam.get_pixel(20, 20), [0, 255, 0]);
        assert_eq!(cam.get_pixel(25, 20), [0, 255, 0]);

        // Corner of the bounding box is outside the disc
        assert_eq!(cam.get_pixel(11, 11), [0, 0, 0]);
    }

    #[test]
    fn test_synthetic_face_has_foreground() {
        let cam = MockCamera::synthetic_face(64, 64);
        // Center of the frame is face, corner is background
        assert_eq!(cam.get_pixel(32, 32), [224, 172, 140]);
        assert_eq!(cam.get_pixel(0, 0), [40, 40, 48]);
    }

    #[test]
    fn test_mock_camera_capture() {
        let mut cam = MockCamera::with_color(50, 50, [128, 128, 128]);
        let frame = cam.capture().unwrap();

        assert_eq!(frame.width, 50);
        assert_eq!(frame.height, 50);
        assert!(!frame.image_data.is_empty());
        // Check PNG magic bytes
        assert_eq!(&frame.image_data[0..4], &[0x89, 0x50, 0x4E, 0x47]);
    }

    #[test]
    fn test_mock_camera_png_roundtrip() {
        let mut cam = MockCamera::new(32, 32);
        cam.fill([100, 150, 200]);
        cam.draw_rect(8, 8, 16, 16, [255, 0, 0]);

        let png = cam.to_png().unwrap();
        let cam2 = MockCamera::from_png_bytes(&png).unwrap();

        assert_eq!(cam2.width(), cam.width());
        assert_eq!(cam2.height(), cam.height());
        assert_eq!(cam2.get_pixel(0, 0), [100, 150, 200]);
        assert_eq!(cam2.get_pixel(10, 10), [255, 0, 0]);
    }
}
