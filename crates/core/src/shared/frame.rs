use ndarray::{s, ArrayView3, ArrayViewMut3};

use crate::shared::region::Region;

/// A single camera/video frame: contiguous pixel bytes in row-major order.
///
/// Sources deliver RGB (3 channels); crops inherit the layout of their
/// parent frame.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        let shape = self.shape();
        ArrayViewMut3::from_shape(shape, &mut self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Copies the part of the frame covered by `region`.
    ///
    /// The region is clamped to the frame first; a region with nothing
    /// inside the frame yields an empty (0x0) crop.
    pub fn crop(&self, region: &Region) -> Frame {
        let Some(r) = region.clamp_to(self.width, self.height) else {
            return Frame::new(Vec::new(), 0, 0, self.channels, self.index);
        };
        let (x, y) = (r.x as usize, r.y as usize);
        let (w, h) = (r.width as usize, r.height as usize);

        let view = self.as_ndarray();
        let data: Vec<u8> = view.slice(s![y..y + h, x..x + w, ..]).iter().copied().collect();

        Frame::new(data, w as u32, h as u32, self.channels, self.index)
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_frame(width: u32, height: u32) -> Frame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for row in 0..height {
            for col in 0..width {
                data.extend_from_slice(&[row as u8, col as u8, 7]);
            }
        }
        Frame::new(data, width, height, 3, 4)
    }

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::new(data.clone(), 2, 2, 3, 5);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.index(), 5);
        assert_eq!(frame.data(), &data[..]);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * channels")]
    fn test_mismatched_data_length_panics_in_debug() {
        Frame::new(vec![0u8; 10], 2, 2, 3, 0);
    }

    #[test]
    fn test_as_ndarray_shape() {
        let frame = Frame::new(vec![0u8; 24], 4, 2, 3, 0);
        assert_eq!(frame.as_ndarray().shape(), &[2, 4, 3]);
    }

    #[test]
    fn test_as_ndarray_mut_modification() {
        let mut frame = Frame::new(vec![0u8; 12], 2, 2, 3, 0);
        frame.as_ndarray_mut()[[0, 1, 2]] = 128;
        assert_eq!(frame.as_ndarray()[[0, 1, 2]], 128);
    }

    #[test]
    fn test_crop_copies_region_pixels() {
        let frame = gradient_frame(10, 8);
        let crop = frame.crop(&Region::new(2, 3, 4, 2));

        assert_eq!((crop.width(), crop.height(), crop.channels()), (4, 2, 3));
        assert_eq!(crop.index(), 4);
        let view = crop.as_ndarray();
        assert_eq!(view[[0, 0, 0]], 3); // row
        assert_eq!(view[[0, 0, 1]], 2); // col
        assert_eq!(view[[1, 3, 0]], 4);
        assert_eq!(view[[1, 3, 1]], 5);
    }

    #[test]
    fn test_crop_is_clamped_to_frame() {
        let frame = gradient_frame(10, 8);
        let crop = frame.crop(&Region::new(7, 6, 10, 10));
        assert_eq!((crop.width(), crop.height()), (3, 2));
    }

    #[test]
    fn test_crop_outside_frame_is_empty() {
        let frame = gradient_frame(10, 8);
        let crop = frame.crop(&Region::new(20, 20, 5, 5));
        assert_eq!((crop.width(), crop.height()), (0, 0));
        assert!(crop.data().is_empty());
    }
}
