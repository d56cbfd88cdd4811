use std::path::{Path, PathBuf};

use crate::shared::frame::Frame;
use crate::video::domain::frame_sink::FrameSink;

/// Saves every `every`-th annotated frame as `frame_NNNNNN.png`.
pub struct ImageSequenceSink {
    dir: PathBuf,
    every: usize,
    written: usize,
}

impl ImageSequenceSink {
    pub fn new(dir: impl Into<PathBuf>, every: usize) -> Result<Self, std::io::Error> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            every: every.max(1),
            written: 0,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn written(&self) -> usize {
        self.written
    }

    fn path_for(&self, frame: &Frame) -> PathBuf {
        self.dir.join(format!("frame_{:06}.png", frame.index()))
    }
}

impl FrameSink for ImageSequenceSink {
    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if frame.index() % self.every != 0 {
            return Ok(());
        }
        let img = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .ok_or("Failed to create image from frame data")?;
        img.save(self.path_for(frame))?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        log::info!("Saved {} frames to {}", self.written, self.dir.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_frame(index: usize, rgb: [u8; 3]) -> Frame {
        let data = rgb.repeat(20 * 10);
        Frame::new(data, 20, 10, 3, index)
    }

    #[test]
    fn test_writes_numbered_png() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = ImageSequenceSink::new(dir.path().join("out"), 1).unwrap();
        sink.write(&make_frame(123, [50, 100, 200])).unwrap();

        let img = image::open(dir.path().join("out/frame_000123.png"))
            .unwrap()
            .to_rgb8();
        assert_eq!(img.dimensions(), (20, 10));
        assert_eq!(img.get_pixel(0, 0).0, [50, 100, 200]);
    }

    #[test]
    fn test_only_every_nth_frame_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = ImageSequenceSink::new(dir.path(), 3).unwrap();
        for i in 0..7 {
            sink.write(&make_frame(i, [0, 0, 0])).unwrap();
        }
        sink.finish().unwrap();

        assert_eq!(sink.written(), 3);
        assert!(dir.path().join("frame_000000.png").exists());
        assert!(dir.path().join("frame_000003.png").exists());
        assert!(dir.path().join("frame_000006.png").exists());
        assert!(!dir.path().join("frame_000001.png").exists());
    }

    #[test]
    fn test_zero_interval_keeps_every_frame() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = ImageSequenceSink::new(dir.path(), 0).unwrap();
        sink.write(&make_frame(1, [0, 0, 0])).unwrap();
        assert_eq!(sink.written(), 1);
    }

    #[test]
    fn test_non_rgb_frame_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = ImageSequenceSink::new(dir.path(), 1).unwrap();
        let gray = Frame::new(vec![0; 200], 20, 10, 1, 0);
        assert!(sink.write(&gray).is_err());
    }
}
