use std::path::Path;

use ffmpeg_next::format::context::{Context, Input};
use ffmpeg_next::software::scaling;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;

/// libavdevice input format used for `/dev/video*` paths.
const CAPTURE_FORMAT: &str = "v4l2";

/// Decodes video files and live capture devices via ffmpeg-next.
///
/// Every decoded picture is converted to RGB24 and wrapped in a [`Frame`].
pub struct FfmpegReader {
    stream: Option<OpenStream>,
}

struct OpenStream {
    input: Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: scaling::Context,
    stream_index: usize,
    width: u32,
    height: u32,
}

// Safety: FfmpegReader is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegReader {}

impl FfmpegReader {
    pub fn new() -> Self {
        Self { stream: None }
    }
}

impl Default for FfmpegReader {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoReader for FfmpegReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;
        let input = open_input(path)?;

        let stream = input
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;
        let stream_index = stream.index();
        let rate = stream.rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };
        let total_frames = stream.frames().max(0) as usize;

        let decoder = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?
            .decoder()
            .video()?;
        let (width, height) = (decoder.width(), decoder.height());
        let scaler = scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            scaling::Flags::BILINEAR,
        )?;

        log::info!(
            "Opened {} ({width}x{height} @ {fps:.2} fps)",
            path.display()
        );

        self.stream = Some(OpenStream {
            input,
            decoder,
            scaler,
            stream_index,
            width,
            height,
        });

        Ok(VideoMetadata {
            width,
            height,
            fps,
            total_frames,
            source_path: Some(path.to_path_buf()),
        })
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        let Some(stream) = self.stream.as_mut() else {
            return Box::new(std::iter::once(Err("FfmpegReader: not opened".into())));
        };
        Box::new(FfmpegFrameIter {
            stream,
            frame_index: 0,
            flushing: false,
            done: false,
        })
    }

    fn close(&mut self) {
        self.stream = None;
    }
}

/// `/dev/video*` on Linux, opened through libavdevice.
pub fn is_capture_device(path: &Path) -> bool {
    cfg!(target_os = "linux")
        && path.starts_with("/dev")
        && path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().starts_with("video"))
}

fn open_input(path: &Path) -> Result<Input, Box<dyn std::error::Error>> {
    if !is_capture_device(path) {
        return Ok(ffmpeg_next::format::input(path)?);
    }

    ffmpeg_next::device::register_all();
    let format = ffmpeg_next::device::input::video()
        .find(|f| f.name() == CAPTURE_FORMAT)
        .ok_or_else(|| format!("ffmpeg was built without {CAPTURE_FORMAT} capture support"))?;
    match ffmpeg_next::format::open_with(path, &format, ffmpeg_next::Dictionary::new())? {
        Context::Input(input) => Ok(input),
        Context::Output(_) => Err(format!("{} is not a capture input", path.display()).into()),
    }
}

/// Decodes lazily, one picture per `next()`.
struct FfmpegFrameIter<'a> {
    stream: &'a mut OpenStream,
    frame_index: usize,
    flushing: bool,
    done: bool,
}

impl FfmpegFrameIter<'_> {
    fn try_receive(&mut self) -> Option<Result<Frame, Box<dyn std::error::Error>>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        self.stream.decoder.receive_frame(&mut decoded).ok()?;

        let mut rgb = ffmpeg_next::util::frame::video::Video::empty();
        if let Err(e) = self.stream.scaler.run(&decoded, &mut rgb) {
            return Some(Err(Box::new(e)));
        }
        let (width, height) = (self.stream.width, self.stream.height);
        let frame = Frame::new(
            packed_rgb(&rgb, width, height),
            width,
            height,
            3,
            self.frame_index,
        );
        self.frame_index += 1;
        Some(Ok(frame))
    }
}

impl Iterator for FfmpegFrameIter<'_> {
    type Item = Result<Frame, Box<dyn std::error::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some(result) = self.try_receive() {
            return Some(result);
        }
        if self.flushing {
            self.done = true;
            return None;
        }

        loop {
            let Some((stream, packet)) = self.stream.input.packets().next() else {
                let _ = self.stream.decoder.send_eof();
                self.flushing = true;
                let result = self.try_receive();
                self.done = result.is_none();
                return result;
            };
            if stream.index() != self.stream.stream_index {
                continue;
            }
            if let Err(e) = self.stream.decoder.send_packet(&packet) {
                log::debug!("Dropping undecodable packet: {e}");
                continue;
            }
            if let Some(result) = self.try_receive() {
                return Some(result);
            }
        }
    }
}

/// Copies an RGB24 picture into a tightly packed buffer, dropping row
/// padding (stride may exceed `width * 3`).
fn packed_rgb(
    rgb: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb.stride(0);
    let data = rgb.data(0);
    let row_len = width as usize * 3;

    let mut pixels = Vec::with_capacity(row_len * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_len]);
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    /// Encodes `num_frames` grey frames with a bright square drifting right.
    fn write_test_video(path: &Path, num_frames: usize, width: u32, height: u32) {
        use ffmpeg_next::{codec, encoder, format, Packet, Rational};

        ffmpeg_next::init().unwrap();
        let mut octx = format::output(path).unwrap();
        let codec = encoder::find(codec::Id::MPEG4).unwrap();
        let mut ost = octx.add_stream(Some(codec)).unwrap();

        let mut ctx = codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .unwrap();
        ctx.set_width(width);
        ctx.set_height(height);
        ctx.set_format(format::Pixel::YUV420P);
        ctx.set_time_base(Rational(1, 10));
        ctx.set_frame_rate(Some(Rational(10, 1)));
        if octx.format().flags().contains(format::Flags::GLOBAL_HEADER) {
            ctx.set_flags(codec::Flags::GLOBAL_HEADER);
        }
        let mut enc = ctx.open_with(ffmpeg_next::Dictionary::new()).unwrap();
        ost.set_parameters(&enc);
        octx.write_header().unwrap();
        let time_base = octx.stream(0).unwrap().time_base();

        let mut to_yuv = scaling::Context::get(
            format::Pixel::RGB24,
            width,
            height,
            format::Pixel::YUV420P,
            width,
            height,
            scaling::Flags::BILINEAR,
        )
        .unwrap();

        for i in 0..num_frames {
            let mut rgb = ffmpeg_next::util::frame::video::Video::new(
                format::Pixel::RGB24,
                width,
                height,
            );
            let stride = rgb.stride(0);
            let data = rgb.data_mut(0);
            for row in 0..height as usize {
                for col in 0..width as usize {
                    let lit = (32..64).contains(&row) && (i * 8..i * 8 + 32).contains(&col);
                    let v = if lit { 230 } else { 40 };
                    data[row * stride + col * 3..row * stride + col * 3 + 3].fill(v);
                }
            }
            let mut yuv = ffmpeg_next::util::frame::video::Video::empty();
            to_yuv.run(&rgb, &mut yuv).unwrap();
            yuv.set_pts(Some(i as i64));
            enc.send_frame(&yuv).unwrap();

            let mut packet = Packet::empty();
            while enc.receive_packet(&mut packet).is_ok() {
                packet.set_stream(0);
                packet.rescale_ts(Rational(1, 10), time_base);
                packet.write_interleaved(&mut octx).unwrap();
            }
        }

        enc.send_eof().unwrap();
        let mut packet = Packet::empty();
        while enc.receive_packet(&mut packet).is_ok() {
            packet.set_stream(0);
            packet.rescale_ts(Rational(1, 10), time_base);
            packet.write_interleaved(&mut octx).unwrap();
        }
        octx.write_trailer().unwrap();
    }

    #[test]
    fn test_open_reports_geometry_and_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kiosk.mp4");
        write_test_video(&path, 4, 160, 120);

        let mut reader = FfmpegReader::new();
        let meta = reader.open(&path).unwrap();
        assert_eq!((meta.width, meta.height), (160, 120));
        assert!(meta.has_frame_rate());
        assert_eq!(meta.source_path, Some(path));
    }

    #[test]
    fn test_frames_are_rgb_with_sequential_indices() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kiosk.mp4");
        write_test_video(&path, 6, 160, 120);

        let mut reader = FfmpegReader::new();
        reader.open(&path).unwrap();
        let frames: Vec<Frame> = reader.frames().map(|f| f.unwrap()).collect();

        assert_eq!(frames.len(), 6);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.index(), i);
            assert_eq!(frame.channels(), 3);
            assert_eq!(frame.data().len(), 160 * 120 * 3);
        }
    }

    #[test]
    fn test_open_missing_file_fails() {
        let mut reader = FfmpegReader::new();
        assert!(reader.open(Path::new("/nonexistent/kiosk.mp4")).is_err());
    }

    #[test]
    fn test_frames_before_open_yields_error() {
        let mut reader = FfmpegReader::new();
        assert!(reader.frames().next().unwrap().is_err());
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut reader = FfmpegReader::new();
        reader.close();
        reader.close();
        assert!(reader.frames().next().unwrap().is_err());
    }

    #[rstest]
    #[case("/dev/video0", cfg!(target_os = "linux"))]
    #[case("/dev/sda", false)]
    #[case("/home/kiosk/video0.mp4", false)]
    #[case("clips/entrance.mp4", false)]
    fn test_capture_device_detection(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(is_capture_device(Path::new(path)), expected);
    }
}
