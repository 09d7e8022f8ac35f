use crate::error::KernelError;

/// A rectangular grid of weights, stored row-major. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    width: usize,
    height: usize,
    weights: Vec<f32>,
}

impl Kernel {
    pub fn new(width: usize, height: usize, weights: Vec<f32>) -> Result<Self, KernelError> {
        if width == 0 || height == 0 || weights.is_empty() {
            return Err(KernelError::Empty);
        }
        if width.checked_mul(height) != Some(weights.len()) {
            return Err(KernelError::ShapeMismatch {
                width,
                height,
                len: weights.len(),
            });
        }
        if let Some(index) = weights.iter().position(|w| !w.is_finite()) {
            return Err(KernelError::NonFinite { index });
        }
        Ok(Self { width, height, weights })
    }

    pub fn from_rows<R: AsRef<[f32]>>(rows: &[R]) -> Result<Self, KernelError> {
        let width = rows.first().map_or(0, |r| r.as_ref().len());
        let mut weights = Vec::with_capacity(width.saturating_mul(rows.len()));
        for (row, values) in rows.iter().enumerate() {
            let values = values.as_ref();
            if values.len() != width {
                return Err(KernelError::Ragged {
                    row,
                    expected: width,
                    found: values.len(),
                });
            }
            weights.extend_from_slice(values);
        }
        Self::new(width, rows.len(), weights)
    }

    fn square3(weights: [f32; 9]) -> Self {
        Self {
            width: 3,
            height: 3,
            weights: weights.to_vec(),
        }
    }

    pub fn identity() -> Self {
        Self::square3([0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0])
    }

    pub fn box_blur() -> Self {
        Self::square3([1.0; 9])
    }

    pub fn gaussian_blur() -> Self {
        Self::square3([
            0.045, 0.122, 0.045, //
            0.122, 0.332, 0.122, //
            0.045, 0.122, 0.045,
        ])
    }

    pub fn sharpen() -> Self {
        Self::square3([-1.0, -1.0, -1.0, -1.0, 16.0, -1.0, -1.0, -1.0, -1.0])
    }

    /// Sums to zero, so it is applied with a weight of 1.
    pub fn edge_detect() -> Self {
        Self::square3([-1.0, -1.0, -1.0, -1.0, 8.0, -1.0, -1.0, -1.0, -1.0])
    }

    pub fn emboss() -> Self {
        Self::square3([-2.0, -1.0, 0.0, -1.0, 1.0, 1.0, 0.0, 1.0, 2.0])
    }

    /// Preset lookup by name (`identity`, `box-blur`, `gaussian-blur`,
    /// `sharpen`, `edge-detect`, `emboss`). Underscores work as well.
    pub fn preset(name: &str) -> Option<Self> {
        let kernel = match name.replace('_', "-").as_str() {
            "identity" | "normal" => Self::identity(),
            "box-blur" => Self::box_blur(),
            "gaussian-blur" => Self::gaussian_blur(),
            "sharpen" => Self::sharpen(),
            "edge-detect" => Self::edge_detect(),
            "emboss" => Self::emboss(),
            _ => return None,
        };
        Some(kernel)
    }

    pub const PRESETS: [&'static str; 6] = [
        "identity",
        "box-blur",
        "gaussian-blur",
        "sharpen",
        "edge-detect",
        "emboss",
    ];

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Row-major weights.
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    pub fn weight(&self) -> f32 {
        compute_weight(self)
    }
}

/// Normalization weight: the sum of the weights, or 1 when the sum is not
/// positive (so zero-sum kernels such as edge detection are not divided by 0).
pub fn compute_weight(kernel: &Kernel) -> f32 {
    let sum: f32 = kernel.weights.iter().sum();
    if sum <= 0.0 { 1.0 } else { sum }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_is_the_sum_when_positive() {
        assert_eq!(compute_weight(&Kernel::identity()), 1.0);
        assert_eq!(compute_weight(&Kernel::box_blur()), 9.0);
        assert_eq!(compute_weight(&Kernel::sharpen()), 8.0);
        assert_eq!(compute_weight(&Kernel::emboss()), 1.0);
    }

    #[test]
    fn non_positive_sums_weigh_one() {
        assert_eq!(compute_weight(&Kernel::edge_detect()), 1.0);
        let zero = Kernel::new(3, 3, vec![0.0; 9]).unwrap();
        assert_eq!(compute_weight(&zero), 1.0);
        let negative = Kernel::new(1, 2, vec![-3.0, 1.0]).unwrap();
        assert_eq!(compute_weight(&negative), 1.0);
    }

    #[test]
    fn gaussian_weight_is_close_to_one() {
        assert!((Kernel::gaussian_blur().weight() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_kernels_are_rejected() {
        assert_eq!(Kernel::new(0, 3, vec![]), Err(KernelError::Empty));
        let rows: [[f32; 0]; 0] = [];
        assert_eq!(Kernel::from_rows(&rows), Err(KernelError::Empty));
    }

    #[test]
    fn shape_must_match_weight_count() {
        assert_eq!(
            Kernel::new(3, 3, vec![1.0; 8]),
            Err(KernelError::ShapeMismatch { width: 3, height: 3, len: 8 })
        );
    }

    #[test]
    fn oversized_shapes_do_not_overflow() {
        assert_eq!(
            Kernel::new(usize::MAX, 2, vec![1.0]),
            Err(KernelError::ShapeMismatch { width: usize::MAX, height: 2, len: 1 })
        );
        let err = Kernel::new(usize::MAX, 2, vec![1.0]).unwrap_err();
        assert!(err.to_string().contains("too large"), "{err}");
    }

    #[test]
    fn non_finite_weights_are_rejected() {
        assert_eq!(
            Kernel::new(1, 2, vec![f32::NAN, 1.0]),
            Err(KernelError::NonFinite { index: 0 })
        );
        assert_eq!(
            Kernel::from_rows(&[[1.0f32, 2.0], [f32::INFINITY, 0.0]]),
            Err(KernelError::NonFinite { index: 2 })
        );
        assert_eq!(
            Kernel::new(3, 1, vec![0.0, 1.0, f32::NEG_INFINITY]),
            Err(KernelError::NonFinite { index: 2 })
        );
    }

    #[test]
    fn rows_are_flattened_row_major() {
        let kernel = Kernel::from_rows(&[[1.0f32, 2.0], [3.0, 4.0], [5.0, 6.0]]).unwrap();
        assert_eq!((kernel.width(), kernel.height()), (2, 3));
        assert_eq!(kernel.weights(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let rows: Vec<Vec<f32>> = vec![vec![1.0, 2.0], vec![3.0]];
        assert_eq!(
            Kernel::from_rows(&rows),
            Err(KernelError::Ragged { row: 1, expected: 2, found: 1 })
        );
    }

    #[test]
    fn every_preset_name_resolves() {
        for name in Kernel::PRESETS {
            assert!(Kernel::preset(name).is_some(), "{name}");
        }
        assert_eq!(Kernel::preset("edge_detect"), Some(Kernel::edge_detect()));
        assert!(Kernel::preset("blur-ish").is_none());
    }
}
