//! V4L2 webcam capture source (linux only).
//!
//! Opens the device fresh for every capture attempt: negotiate a pixel
//! format (MJPG preferred, YUYV fallback), memory-map a buffer stream,
//! discard a few warm-up frames so auto-exposure settles, then grab one
//! frame and encode it as PNG.

use image::{ImageBuffer, RgbImage};
use std::io::Cursor;

use v4l::buffer::Type;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::{Format, FourCC};

use super::source::CaptureSource;
use super::types::{CaptureError, CaptureOutcome, Frame};
use crate::config;

/// Webcam capture via the V4L2 kernel interface
#[derive(Debug, Clone)]
pub struct V4l2Camera {
    /// Device path (e.g., /dev/video0)
    device_path: String,
    /// Requested capture width
    width: u32,
    /// Requested capture height
    height: u32,
    /// Frames discarded before the real capture
    warmup_frames: u32,
}

impl V4l2Camera {
    /// Create a camera source for the given device and resolution
    pub fn new(device_path: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            device_path: device_path.into(),
            width,
            height,
            warmup_frames: config::get().capture.warmup_frames,
        }
    }

    /// Create a camera source from the environment configuration
    pub fn from_config() -> Self {
        let cfg = config::get();
        Self::new(&cfg.capture.device, cfg.capture.width, cfg.capture.height)
    }

    /// Override the number of warm-up frames
    pub fn warmup_frames(mut self, frames: u32) -> Self {
        self.warmup_frames = frames;
        self
    }
}

impl CaptureSource for V4l2Camera {
    fn capture(&mut self) -> CaptureOutcome<Frame> {
        let fourcc_mjpg = FourCC::new(b"MJPG");
        let fourcc_yuyv = FourCC::new(b"YUYV");

        let mut dev = Device::with_path(&self.device_path).map_err(|e| {
            CaptureError::Device(format!("Failed to open '{}': {}", self.device_path, e))
        })?;

        // Prefer MJPG (cheap to ship around), fall back to YUYV
        let format = Format::new(self.width, self.height, fourcc_mjpg);
        let actual = match dev.set_format(&format) {
            Ok(f) if f.fourcc == fourcc_mjpg => f,
            _ => dev
                .set_format(&Format::new(self.width, self.height, fourcc_yuyv))
                .map_err(|e| CaptureError::Device(format!("Failed to set format: {}", e)))?,
        };

        if actual.fourcc != fourcc_mjpg && actual.fourcc != fourcc_yuyv {
            return Err(CaptureError::Decode(format!(
                "Device negotiated unsupported format {}",
                actual.fourcc
            )));
        }

        tracing::debug!(
            device = %self.device_path,
            width = actual.width,
            height = actual.height,
            fourcc = %actual.fourcc,
            "camera format negotiated"
        );

        let mut stream = MmapStream::with_buffers(&mut dev, Type::VideoCapture, 4)
            .map_err(|e| CaptureError::Device(format!("Failed to start stream: {}", e)))?;

        // Let auto-exposure settle before keeping a frame
        for _ in 0..self.warmup_frames {
            let _ = stream
                .next()
                .map_err(|e| CaptureError::Device(format!("Stream stalled: {}", e)))?;
        }

        let (buf, meta) = stream
            .next()
            .map_err(|e| CaptureError::Device(format!("Stream stalled: {}", e)))?;
        let used = (meta.bytesused as usize).min(buf.len());
        let data = &buf[..used];

        let rgb: RgbImage = if actual.fourcc == fourcc_mjpg {
            image::load_from_memory_with_format(data, image::ImageFormat::Jpeg)
                .map_err(|e| CaptureError::Decode(format!("MJPG frame: {}", e)))?
                .to_rgb8()
        } else {
            yuyv_to_rgb(data, actual.width, actual.height)?
        };

        let mut png_bytes = Vec::new();
        rgb.write_to(&mut Cursor::new(&mut png_bytes), image::ImageFormat::Png)
            .map_err(|e| CaptureError::Decode(format!("Failed to encode PNG: {}", e)))?;

        Ok(Frame {
            image_data: png_bytes,
            width: actual.width,
            height: actual.height,
            metadata: Some(serde_json::json!({
                "device": self.device_path,
                "fourcc": actual.fourcc.to_string(),
            })),
        })
    }

    fn source_type(&self) -> &str {
        "v4l2"
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

/// Convert a packed YUYV (YUV 4:2:2) buffer to RGB using BT.601 coefficients
fn yuyv_to_rgb(data: &[u8], width: u32, height: u32) -> CaptureOutcome<RgbImage> {
    let expected = (width * height * 2) as usize;
    if data.len() < expected {
        return Err(CaptureError::Decode(format!(
            "YUYV frame too short: expected {} bytes, got {}",
            expected,
            data.len()
        )));
    }

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    for chunk in data[..expected].chunks_exact(4) {
        let (y0, u, y1, v) = (chunk[0], chunk[1], chunk[2], chunk[3]);
        push_pixel(&mut rgb, y0, u, v);
        push_pixel(&mut rgb, y1, u, v);
    }

    ImageBuffer::from_raw(width, height, rgb)
        .ok_or_else(|| CaptureError::Decode("YUYV conversion produced wrong buffer size".into()))
}

fn push_pixel(out: &mut Vec<u8>, y: u8, u: u8, v: u8) {
    let c = i32::from(y) - 16;
    let d = i32::from(u) - 128;
    let e = i32::from(v) - 128;

    let r = (298 * c + 409 * e + 128) >> 8;
    let g = (298 * c - 100 * d - 208 * e + 128) >> 8;
    let b = (298 * c + 516 * d + 128) >> 8;

    out.push(r.clamp(0, 255) as u8);
    out.push(g.clamp(0, 255) as u8);
    out.push(b.clamp(0, 255) as u8);
}
