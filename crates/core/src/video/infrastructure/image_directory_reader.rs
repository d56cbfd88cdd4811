use std::path::{Path, PathBuf};

use crate::shared::constants::{DEFAULT_REPLAY_FPS, IMAGE_EXTENSIONS};
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;

/// Replays a directory of still images as a video, in file-name order.
///
/// Gives deterministic runs for rehearsals and tests: the frame rate is
/// fixed up front instead of coming from a device.
pub struct ImageDirectoryReader {
    fps: f64,
    files: Vec<PathBuf>,
}

impl ImageDirectoryReader {
    pub fn new(fps: f64) -> Self {
        Self {
            fps,
            files: Vec::new(),
        }
    }
}

impl Default for ImageDirectoryReader {
    fn default() -> Self {
        Self::new(DEFAULT_REPLAY_FPS)
    }
}

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

impl VideoReader for ImageDirectoryReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let file = entry?.path();
            if file.is_file() && is_image_file(&file) {
                files.push(file);
            }
        }
        files.sort();

        let first = files
            .first()
            .ok_or_else(|| format!("No images found in {}", path.display()))?;
        let (width, height) = image::image_dimensions(first)?;

        log::info!(
            "Replaying {} images from {} at {} fps",
            files.len(),
            path.display(),
            self.fps
        );
        let total_frames = files.len();
        self.files = files;

        Ok(VideoMetadata {
            width,
            height,
            fps: self.fps,
            total_frames,
            source_path: Some(path.to_path_buf()),
        })
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        if self.files.is_empty() {
            return Box::new(std::iter::once(Err(
                "ImageDirectoryReader: not opened".into()
            )));
        }
        Box::new(self.files.iter().enumerate().map(
            |(index, file)| -> Result<Frame, Box<dyn std::error::Error>> {
                let img = image::open(file)?.to_rgb8();
                let (width, height) = img.dimensions();
                Ok(Frame::new(img.into_raw(), width, height, 3, index))
            },
        ))
    }

    fn close(&mut self) {
        self.files.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn write_image(dir: &Path, name: &str, value: u8) {
        image::RgbImage::from_pixel(32, 24, image::Rgb([value, value, value]))
            .save(dir.join(name))
            .unwrap();
    }

    #[test]
    fn test_replays_images_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "frame_002.png", 20);
        write_image(dir.path(), "frame_000.png", 0);
        write_image(dir.path(), "frame_001.png", 10);
        std::fs::write(dir.path().join("notes.txt"), "not an image").unwrap();

        let mut reader = ImageDirectoryReader::new(5.0);
        let meta = reader.open(dir.path()).unwrap();
        assert_eq!((meta.width, meta.height), (32, 24));
        assert_eq!(meta.total_frames, 3);
        assert_eq!(meta.fps, 5.0);

        let frames: Vec<Frame> = reader.frames().map(|f| f.unwrap()).collect();
        let firsts: Vec<u8> = frames.iter().map(|f| f.data()[0]).collect();
        assert_eq!(firsts, vec![0, 10, 20]);
        let indices: Vec<usize> = frames.iter().map(Frame::index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(frames.iter().all(|f| f.channels() == 3));
    }

    #[test]
    fn test_empty_directory_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let mut reader = ImageDirectoryReader::default();
        assert!(reader.open(dir.path()).is_err());
    }

    #[test]
    fn test_missing_directory_fails_to_open() {
        let mut reader = ImageDirectoryReader::default();
        assert!(reader.open(Path::new("/nonexistent/replay")).is_err());
    }

    #[test]
    fn test_frames_after_close_yields_error() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "a.png", 0);
        let mut reader = ImageDirectoryReader::default();
        reader.open(dir.path()).unwrap();
        reader.close();
        assert!(reader.frames().next().unwrap().is_err());
    }

    #[rstest]
    #[case("shot.PNG", true)]
    #[case("shot.jpeg", true)]
    #[case("shot.txt", false)]
    #[case("shot", false)]
    fn test_is_image_file(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_image_file(Path::new(name)), expected);
    }
}
