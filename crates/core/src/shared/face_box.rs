use crate::shared::region::Region;

/// Sub-pixel bounding box `(x, y, w, h)` kept by the tracker.
///
/// Smoothing needs fractional coordinates; rounding happens only when a
/// box is drawn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl FaceBox {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.x, self.y, self.w, self.h]
    }

    pub fn from_array(values: [f64; 4]) -> Self {
        Self::new(values[0], values[1], values[2], values[3])
    }

    pub fn to_region(&self) -> Region {
        Region::new(
            self.x.round() as i32,
            self.y.round() as i32,
            self.w.round() as i32,
            self.h.round() as i32,
        )
    }
}

impl From<Region> for FaceBox {
    fn from(r: Region) -> Self {
        Self::new(r.x as f64, r.y as f64, r.width as f64, r.height as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_region() {
        let b = FaceBox::from(Region::new(1, 2, 3, 4));
        assert_eq!(b, FaceBox::new(1.0, 2.0, 3.0, 4.0));
    }

    #[test]
    fn test_to_region_rounds() {
        let b = FaceBox::new(10.4, 10.6, 49.5, 50.2);
        assert_eq!(b.to_region(), Region::new(10, 11, 50, 50));
    }

    #[test]
    fn test_array_conversion() {
        let b = FaceBox::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(FaceBox::from_array(b.as_array()), b);
    }
}
