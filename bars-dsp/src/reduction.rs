/// How a slice of samples is collapsed into a single bucket value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Reduction {
    #[default]
    Max, // Loudest sample of the slice
    Average, // Arithmetic mean
}

impl Reduction {
    /// Reduces `slice` to one value. An empty slice reduces to `0.0`.
    pub fn calculate(&self, slice: &[f32]) -> f32 {
        if slice.is_empty() {
            return 0.0;
        }
        let num_elements = slice.len() as f32;

        match *self {
            Reduction::Max => {
                let max = slice.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                // An all-NaN slice leaves the fold at -inf.
                if max == f32::NEG_INFINITY {
                    0.0
                } else {
                    max
                }
            }
            Reduction::Average => slice.iter().copied().sum::<f32>() / num_elements,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduction() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];

        assert_eq!(Reduction::Average.calculate(&data), 3.0);
        assert_eq!(Reduction::Max.calculate(&data), 5.0);
        assert_eq!(Reduction::Average.calculate(&[-1.0, 1.0]), 0.0);
    }

    #[test]
    fn empty_slice_reduces_to_zero() {
        assert_eq!(Reduction::Max.calculate(&[]), 0.0);
        assert_eq!(Reduction::Average.calculate(&[]), 0.0);
    }

    #[test]
    fn max_ignores_nan_samples() {
        assert_eq!(Reduction::Max.calculate(&[0.2, f32::NAN, 0.7]), 0.7);
    }
}
