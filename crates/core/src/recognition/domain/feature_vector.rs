/// Fixed-length face descriptor with components in `[0, 1]`.
///
/// Vectors are only comparable when produced with the same crop size, i.e.
/// when their lengths agree.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureVector {
    values: Vec<f32>,
}

impl FeatureVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Euclidean distance, or `None` if the vectors have different lengths.
    pub fn distance(&self, other: &FeatureVector) -> Option<f64> {
        if self.values.len() != other.values.len() {
            return None;
        }
        let sum: f64 = self
            .values
            .iter()
            .zip(&other.values)
            .map(|(&a, &b)| {
                let d = f64::from(a) - f64::from(b);
                d * d
            })
            .sum();
        Some(sum.sqrt())
    }
}
