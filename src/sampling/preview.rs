//! Consumers of per-cycle results other than the dispatcher.

use crate::capture::Frame;
use chrono::Local;
use image::ImageFormat;
use std::path::{Path, PathBuf};

/// Receives the outcome of every successful sampling cycle.
///
/// Both methods are called exactly once per cycle. Implementations handle
/// their own failures; a preview never stops sampling.
pub trait PreviewSink {
    /// A new lux estimate is available.
    fn new_lux_value(&mut self, lux: u64);

    /// A new frame was captured (before cropping).
    fn new_image(&mut self, frame: &Frame);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPreview;

impl PreviewSink for NoPreview {
    fn new_lux_value(&mut self, _lux: u64) {}

    fn new_image(&mut self, _frame: &Frame) {}
}

/// Logs each value as `HH:MM:SS - N lux`.
#[derive(Debug, Default, Clone)]
pub struct LogPreview {
    last_line: Option<String>,
}

impl LogPreview {
    /// Creates a log preview.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last line logged.
    pub fn last_line(&self) -> Option<&str> {
        self.last_line.as_deref()
    }
}

impl PreviewSink for LogPreview {
    fn new_lux_value(&mut self, lux: u64) {
        let line = format!("{} - {} lux", Local::now().format("%H:%M:%S"), lux);
        tracing::info!("{}", line);
        self.last_line = Some(line);
    }

    fn new_image(&mut self, frame: &Frame) {
        tracing::trace!(?frame, "Frame captured");
    }
}

/// Writes every captured frame to a JPEG file, overwriting the previous one.
#[derive(Debug, Clone)]
pub struct JpegPreview {
    path: PathBuf,
}

impl JpegPreview {
    /// Creates a preview writing to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Target file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreviewSink for JpegPreview {
    fn new_lux_value(&mut self, _lux: u64) {}

    fn new_image(&mut self, frame: &Frame) {
        if let Err(e) = frame.image().save_with_format(&self.path, ImageFormat::Jpeg) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to write preview image");
        }
    }
}

impl<S: PreviewSink + ?Sized> PreviewSink for Box<S> {
    fn new_lux_value(&mut self, lux: u64) {
        (**self).new_lux_value(lux);
    }

    fn new_image(&mut self, frame: &Frame) {
        (**self).new_image(frame);
    }
}

impl<S: PreviewSink> PreviewSink for Vec<S> {
    fn new_lux_value(&mut self, lux: u64) {
        for sink in self.iter_mut() {
            sink.new_lux_value(lux);
        }
    }

    fn new_image(&mut self, frame: &Frame) {
        for sink in self.iter_mut() {
            sink.new_image(frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn gray_frame(level: u8) -> Frame {
        Frame::new(RgbImage::from_pixel(16, 12, Rgb([level, level, level])), 1)
    }

    #[test]
    fn test_log_preview_format() {
        let mut preview = LogPreview::new();
        assert!(preview.last_line().is_none());

        preview.new_lux_value(250);
        let line = preview.last_line().unwrap();
        assert!(line.ends_with(" - 250 lux"));
        // HH:MM:SS prefix
        assert_eq!(line.len(), "00:00:00 - 250 lux".len());
        assert_eq!(&line[2..3], ":");
    }

    #[test]
    fn test_jpeg_preview_writes_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preview.jpg");
        let mut preview = JpegPreview::new(&path);

        preview.new_image(&gray_frame(90));

        let written = image::open(&path).unwrap();
        assert_eq!(written.width(), 16);
        assert_eq!(written.height(), 12);
    }

    #[test]
    fn test_jpeg_preview_bad_path_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let mut preview = JpegPreview::new(dir.path().join("missing").join("preview.jpg"));
        preview.new_image(&gray_frame(90));
        assert!(!preview.path().exists());
    }

    #[test]
    fn test_sinks_fan_out() {
        let mut sinks: Vec<Box<dyn PreviewSink + Send>> =
            vec![Box::new(LogPreview::new()), Box::new(NoPreview)];
        sinks.new_lux_value(12);
        sinks.new_image(&gray_frame(1));
    }
}
