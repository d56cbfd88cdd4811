use ab_glyph::{FontRef, InvalidFont, PxScale};
use image::{GrayImage, Luma};
use imageproc::drawing::{draw_text_mut, text_size};
use ndarray::{s, ArrayViewMut3, Axis};

use crate::pipeline::kiosk_view::KioskView;
use crate::rendering::domain::overlay_renderer::OverlayRenderer;
use crate::shared::frame::Frame;
use crate::tracking::domain::registration::RegistrationStatus;

pub type Rgb = [u8; 3];

pub const REGISTERING_COLOR: Rgb = [0, 255, 0];
pub const COMPLETE_COLOR: Rgb = [0, 0, 255];
pub const ALREADY_PLAYED_COLOR: Rgb = [255, 0, 0];
const BAR_TRACK_COLOR: Rgb = [100, 100, 100];

const BOX_THICKNESS: i64 = 2;
const FACE_BAR_HEIGHT: i64 = 6;
const FACE_BAR_GAP: i64 = 4;

/// Banner strip geometry, measured from the frame edges.
const BANNER_MARGIN: i64 = 10;
const BANNER_HEIGHT: i64 = 50;
const BANNER_BAR_HEIGHT: i64 = 10;
const BANNER_BAR_GAP: i64 = 10;

const HEADLINE_PX: f32 = 22.0;
const HEADLINE_INSET: i64 = 10;

pub const DEFAULT_BANNER_ALPHA: f64 = 0.7;

const FONT_DATA: &[u8] = include_bytes!("../../../assets/fonts/DejaVuSans.ttf");

/// Draws face boxes, per-face progress bars and a darkened bottom banner
/// carrying the kiosk headline, directly into RGB frames.
pub struct CpuOverlayRenderer {
    banner_alpha: f64,
    font: FontRef<'static>,
}

impl CpuOverlayRenderer {
    pub fn new(banner_alpha: f64) -> Result<Self, InvalidFont> {
        Ok(Self {
            banner_alpha: banner_alpha.clamp(0.0, 1.0),
            font: FontRef::try_from_slice(FONT_DATA)?,
        })
    }
}

impl OverlayRenderer for CpuOverlayRenderer {
    fn render(
        &self,
        frame: &mut Frame,
        view: &KioskView,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if frame.channels() < 3 {
            return Err(format!(
                "overlay needs an RGB frame, got {} channel(s)",
                frame.channels()
            )
            .into());
        }
        let (fw, fh) = (frame.width() as i64, frame.height() as i64);
        let mut pixels = frame.as_ndarray_mut();

        for face in &view.faces {
            let r = face.smoothed_box.to_region();
            let (x0, y0) = (r.x as i64, r.y as i64);
            let (x1, y1) = (x0 + r.width as i64, y0 + r.height as i64);
            stroke_rect(&mut pixels, x0, y0, x1, y1, status_color(face.status));

            if face.status == RegistrationStatus::Registering {
                if let Some(progress) = face.progress {
                    let top = y1 + FACE_BAR_GAP;
                    draw_bar(&mut pixels, x0, top, x1, top + FACE_BAR_HEIGHT, progress);
                }
            }
        }

        let banner_top = fh - BANNER_MARGIN - BANNER_HEIGHT;
        darken_rect(
            &mut pixels,
            BANNER_MARGIN,
            banner_top,
            fw - BANNER_MARGIN,
            fh - BANNER_MARGIN,
            self.banner_alpha,
        );
        draw_headline(
            &mut pixels,
            &self.font,
            BANNER_MARGIN,
            banner_top,
            fw - BANNER_MARGIN,
            fh - BANNER_MARGIN,
            view.headline(),
        );
        if let Some(progress) = view.banner_progress() {
            let bottom = banner_top - BANNER_BAR_GAP;
            draw_bar(
                &mut pixels,
                2 * BANNER_MARGIN,
                bottom - BANNER_BAR_HEIGHT,
                fw - 2 * BANNER_MARGIN,
                bottom,
                progress,
            );
        }

        Ok(())
    }
}

pub fn status_color(status: RegistrationStatus) -> Rgb {
    match status {
        RegistrationStatus::Registering => REGISTERING_COLOR,
        RegistrationStatus::Complete => COMPLETE_COLOR,
        RegistrationStatus::AlreadyPlayed => ALREADY_PLAYED_COLOR,
    }
}

/// Clamps a half-open rectangle to the image; `None` if nothing is left.
fn clip(
    pixels: &ArrayViewMut3<'_, u8>,
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
) -> Option<(usize, usize, usize, usize)> {
    let (h, w) = (pixels.dim().0 as i64, pixels.dim().1 as i64);
    let (x0, x1) = (x0.clamp(0, w), x1.clamp(0, w));
    let (y0, y1) = (y0.clamp(0, h), y1.clamp(0, h));
    if x0 >= x1 || y0 >= y1 {
        return None;
    }
    Some((x0 as usize, y0 as usize, x1 as usize, y1 as usize))
}

fn fill_rect(pixels: &mut ArrayViewMut3<'_, u8>, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb) {
    let Some((x0, y0, x1, y1)) = clip(pixels, x0, y0, x1, y1) else {
        return;
    };
    let mut area = pixels.slice_mut(s![y0..y1, x0..x1, ..3]);
    for mut px in area.lanes_mut(Axis(2)) {
        px[0] = color[0];
        px[1] = color[1];
        px[2] = color[2];
    }
}

fn stroke_rect(pixels: &mut ArrayViewMut3<'_, u8>, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb) {
    let t = BOX_THICKNESS;
    fill_rect(pixels, x0, y0, x1, y0 + t, color);
    fill_rect(pixels, x0, y1 - t, x1, y1, color);
    fill_rect(pixels, x0, y0, x0 + t, y1, color);
    fill_rect(pixels, x1 - t, y0, x1, y1, color);
}

fn draw_bar(pixels: &mut ArrayViewMut3<'_, u8>, x0: i64, y0: i64, x1: i64, y1: i64, progress: f64) {
    fill_rect(pixels, x0, y0, x1, y1, BAR_TRACK_COLOR);
    let filled = ((x1 - x0) as f64 * progress.clamp(0.0, 1.0)) as i64;
    fill_rect(pixels, x0, y0, x0 + filled, y1, REGISTERING_COLOR);
}

/// Blends black over the rectangle with weight `alpha`.
fn darken_rect(pixels: &mut ArrayViewMut3<'_, u8>, x0: i64, y0: i64, x1: i64, y1: i64, alpha: f64) {
    let Some((x0, y0, x1, y1)) = clip(pixels, x0, y0, x1, y1) else {
        return;
    };
    let keep = 1.0 - alpha;
    pixels
        .slice_mut(s![y0..y1, x0..x1, ..3])
        .mapv_inplace(|v| (f64::from(v) * keep).round() as u8);
}

/// White text, left-aligned and vertically centred in the rectangle.
/// Shrunk to fit the width; glyph coverage is blended over the pixels.
fn draw_headline(
    pixels: &mut ArrayViewMut3<'_, u8>,
    font: &FontRef<'_>,
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
    text: &str,
) {
    let Some((x0, y0, x1, y1)) = clip(pixels, x0, y0, x1, y1) else {
        return;
    };
    let (width, height) = ((x1 - x0) as u32, (y1 - y0) as u32);
    let room = width.saturating_sub(2 * HEADLINE_INSET as u32);
    if room == 0 || text.is_empty() {
        return;
    }

    let mut scale = PxScale::from(HEADLINE_PX);
    let (text_w, _) = text_size(scale, font, text);
    if text_w > room {
        scale = PxScale::from(HEADLINE_PX * room as f32 / text_w as f32);
    }
    let (_, text_h) = text_size(scale, font, text);
    let top = (height as i32 - text_h as i32).max(0) / 2;

    let mut mask = GrayImage::new(width, height);
    draw_text_mut(&mut mask, Luma([255u8]), HEADLINE_INSET as i32, top, scale, font, text);

    for (mx, my, coverage) in mask.enumerate_pixels() {
        let a = f64::from(coverage.0[0]) / 255.0;
        if a == 0.0 {
            continue;
        }
        pixels
            .slice_mut(s![y0 + my as usize, x0 + mx as usize, ..3])
            .mapv_inplace(|v| (f64::from(v) + (255.0 - f64::from(v)) * a).round() as u8);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::kiosk_view::TrackedFaceView;
    use crate::shared::face_box::FaceBox;

    fn renderer() -> CpuOverlayRenderer {
        CpuOverlayRenderer::new(DEFAULT_BANNER_ALPHA).unwrap()
    }

    fn make_frame(width: u32, height: u32, value: u8) -> Frame {
        Frame::new(vec![value; (width * height * 3) as usize], width, height, 3, 0)
    }

    fn pixel(frame: &Frame, x: usize, y: usize) -> [u8; 3] {
        let i = (y * frame.width() as usize + x) * 3;
        [frame.data()[i], frame.data()[i + 1], frame.data()[i + 2]]
    }

    fn view_with(status: RegistrationStatus, progress: Option<f64>) -> KioskView {
        KioskView {
            faces: vec![TrackedFaceView {
                identity: 1,
                smoothed_box: FaceBox::new(20.0, 20.0, 40.0, 40.0),
                progress,
                status,
            }],
            detection_ran: true,
            has_searched: true,
        }
    }

    #[test]
    fn test_box_outline_uses_status_color() {
        for status in [
            RegistrationStatus::Registering,
            RegistrationStatus::Complete,
            RegistrationStatus::AlreadyPlayed,
        ] {
            let mut frame = make_frame(200, 200, 50);
            renderer()
                .render(&mut frame, &view_with(status, None))
                .unwrap();

            assert_eq!(pixel(&frame, 20, 20), status_color(status));
            assert_eq!(pixel(&frame, 59, 40), status_color(status));
            // Interior untouched.
            assert_eq!(pixel(&frame, 40, 40), [50, 50, 50]);
        }
    }

    #[test]
    fn test_progress_bar_fill_matches_progress() {
        let mut frame = make_frame(200, 200, 50);
        renderer()
            .render(&mut frame, &view_with(RegistrationStatus::Registering, Some(0.5)))
            .unwrap();

        // Bar spans x 20..60 at y 64..70; half of 40px is filled.
        assert_eq!(pixel(&frame, 25, 66), REGISTERING_COLOR);
        assert_eq!(pixel(&frame, 39, 66), REGISTERING_COLOR);
        assert_eq!(pixel(&frame, 40, 66), BAR_TRACK_COLOR);
        assert_eq!(pixel(&frame, 59, 66), BAR_TRACK_COLOR);
    }

    #[test]
    fn test_banner_is_darkened() {
        let mut frame = make_frame(200, 200, 100);
        renderer()
            .render(&mut frame, &KioskView::default())
            .unwrap();

        // Left of the headline and below its glyphs.
        assert_eq!(pixel(&frame, 15, 187), [30, 30, 30]);
        // Margins and the area above the banner are untouched.
        assert_eq!(pixel(&frame, 5, 170), [100, 100, 100]);
        assert_eq!(pixel(&frame, 100, 100), [100, 100, 100]);
    }

    fn banner_pixels(frame: &Frame) -> Vec<u8> {
        frame
            .as_ndarray()
            .slice(s![140..190, 10..190, ..])
            .iter()
            .copied()
            .collect()
    }

    #[test]
    fn test_headline_is_drawn_in_banner() {
        let mut frame = make_frame(200, 200, 100);
        renderer().render(&mut frame, &KioskView::default()).unwrap();

        let banner = banner_pixels(&frame);
        assert!(banner.iter().any(|&v| v > 30), "no headline glyphs drawn");
        assert!(banner.iter().all(|&v| v >= 30));
    }

    #[test]
    fn test_banner_changes_with_headline() {
        let mut welcome = make_frame(200, 200, 100);
        renderer().render(&mut welcome, &KioskView::default()).unwrap();

        let mut no_face = make_frame(200, 200, 100);
        let searched = KioskView {
            has_searched: true,
            ..KioskView::default()
        };
        assert_ne!(searched.headline(), KioskView::default().headline());
        renderer().render(&mut no_face, &searched).unwrap();

        assert_ne!(banner_pixels(&welcome), banner_pixels(&no_face));
        // Above the banner nothing differs.
        assert_eq!(pixel(&welcome, 100, 50), pixel(&no_face, 100, 50));
    }

    #[test]
    fn test_headline_on_tiny_frame_does_not_panic() {
        let mut frame = make_frame(24, 24, 100);
        renderer().render(&mut frame, &KioskView::default()).unwrap();
    }

    #[test]
    fn test_box_partly_outside_frame_is_clipped() {
        let mut frame = make_frame(200, 200, 0);
        let mut view = view_with(RegistrationStatus::Complete, None);
        view.faces[0].smoothed_box = FaceBox::new(-30.0, 30.0, 300.0, 100.0);

        renderer().render(&mut frame, &view).unwrap();
        assert_eq!(pixel(&frame, 10, 30), COMPLETE_COLOR);
    }

    #[test]
    fn test_single_channel_frame_is_rejected() {
        let mut frame = Frame::new(vec![0; 100], 10, 10, 1, 0);
        assert!(renderer()
            .render(&mut frame, &KioskView::default())
            .is_err());
    }

    #[test]
    fn test_preserves_frame_index() {
        let mut frame = Frame::new(vec![0; 300], 10, 10, 3, 42);
        renderer()
            .render(&mut frame, &KioskView::default())
            .unwrap();
        assert_eq!(frame.index(), 42);
    }
}
