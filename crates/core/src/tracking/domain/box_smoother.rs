use crate::shared::face_box::FaceBox;

pub const DEFAULT_ALPHA: f64 = 0.3;

/// Exponential moving average over box coordinates.
///
/// Formula: `smoothed = alpha * observed + (1 - alpha) * previous`, applied
/// independently to x, y, w and h. Lower alpha is smoother but lags more.
#[derive(Clone, Copy, Debug)]
pub struct BoxSmoother {
    alpha: f64,
}

impl BoxSmoother {
    pub fn new(alpha: f64) -> Self {
        Self { alpha }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn smooth(&self, previous: FaceBox, observed: FaceBox) -> FaceBox {
        let prev = previous.as_array();
        let obs = observed.as_array();
        let mut result = [0.0; 4];
        for i in 0..4 {
            result[i] = self.alpha * obs[i] + (1.0 - self.alpha) * prev[i];
        }
        FaceBox::from_array(result)
    }
}

impl Default for BoxSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHA)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_default_alpha() {
        assert_relative_eq!(BoxSmoother::default().alpha(), 0.3);
    }

    #[test]
    fn test_applies_ema_per_coordinate() {
        let smoother = BoxSmoother::new(0.3);
        let result = smoother.smooth(
            FaceBox::new(100.0, 200.0, 50.0, 60.0),
            FaceBox::new(110.0, 210.0, 60.0, 70.0),
        );

        assert_relative_eq!(result.x, 0.3 * 110.0 + 0.7 * 100.0);
        assert_relative_eq!(result.y, 0.3 * 210.0 + 0.7 * 200.0);
        assert_relative_eq!(result.w, 0.3 * 60.0 + 0.7 * 50.0);
        assert_relative_eq!(result.h, 0.3 * 70.0 + 0.7 * 60.0);
    }

    #[test]
    fn test_alpha_one_follows_observation() {
        let smoother = BoxSmoother::new(1.0);
        let observed = FaceBox::new(7.0, 8.0, 9.0, 10.0);
        assert_eq!(smoother.smooth(FaceBox::new(0.0, 0.0, 0.0, 0.0), observed), observed);
    }

    #[rstest]
    #[case(0.3, 1)]
    #[case(0.3, 10)]
    #[case(0.3, 60)]
    #[case(0.75, 25)]
    fn test_error_shrinks_geometrically(#[case] alpha: f64, #[case] frames: i32) {
        let smoother = BoxSmoother::new(alpha);
        let initial = FaceBox::new(0.0, 400.0, 10.0, 300.0);
        let target = FaceBox::new(320.0, 240.0, 80.0, 90.0);

        let mut smoothed = initial;
        for _ in 0..frames {
            smoothed = smoother.smooth(smoothed, target);
        }

        let bound = (1.0 - alpha).powi(frames);
        let s = smoothed.as_array();
        let b = target.as_array();
        let i0 = initial.as_array();
        for k in 0..4 {
            assert!((s[k] - b[k]).abs() <= (i0[k] - b[k]).abs() * bound + 1e-9);
        }
    }
}
