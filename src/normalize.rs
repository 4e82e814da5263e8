use serde::{Deserialize, Serialize};

/// Visual marker size bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeRange {
    pub min: f64,
    pub max: f64,
}

impl SizeRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }
}

/// Absolute tolerance 1e-8 plus relative tolerance 1e-5 of `b`.
pub fn is_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-8 + 1e-5 * b.abs()
}

pub fn normalize(value: f64, global_min: f64, global_max: f64, out: SizeRange) -> f64 {
    if is_close(global_max, global_min) {
        return out.midpoint();
    }
    out.min + (value - global_min) / (global_max - global_min) * (out.max - out.min)
}

/// A fitted min/max pair shared by every series that must stay comparable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SizeScale {
    pub min: f64,
    pub max: f64,
    pub out: SizeRange,
}

impl SizeScale {
    /// Fits the scale across all values; `None` when there are none.
    pub fn fit<I>(values: I, out: SizeRange) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut bounds: Option<(f64, f64)> = None;
        for value in values {
            bounds = Some(match bounds {
                None => (value, value),
                Some((lo, hi)) => (lo.min(value), hi.max(value)),
            });
        }
        bounds.map(|(min, max)| Self { min, max, out })
    }

    pub fn size(&self, value: f64) -> f64 {
        normalize(value, self.min, self.max, self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_range_linearly() {
        let out = SizeRange::new(12.0, 30.0);
        assert_eq!(normalize(0.0, 0.0, 10.0, out), 12.0);
        assert_eq!(normalize(10.0, 0.0, 10.0, out), 30.0);
        assert!((normalize(5.0, 0.0, 10.0, out) - 21.0).abs() < 1e-9);
    }

    #[test]
    fn degenerate_range_returns_midpoint() {
        let out = SizeRange::new(12.0, 28.0);
        assert_eq!(normalize(3.2, 3.2, 3.2, out), 20.0);
        assert_eq!(normalize(3.2, 3.2, 3.2 + 1e-12, out), 20.0);
        assert_eq!(normalize(99.0, 1.0, 1.0, out), 20.0);
    }

    #[test]
    fn commutes_with_affine_rescaling_of_output() {
        let base = SizeRange::new(0.0, 1.0);
        let scaled = SizeRange::new(10.0, 30.0);
        for value in [1.0, 2.5, 4.0] {
            let unit = normalize(value, 1.0, 4.0, base);
            let direct = normalize(value, 1.0, 4.0, scaled);
            assert!((direct - (10.0 + unit * 20.0)).abs() < 1e-9);
        }
    }

    #[test]
    fn scale_fits_across_all_values() {
        let scale = SizeScale::fit([2.0, 0.5, 4.0], SizeRange::new(12.0, 30.0)).unwrap();
        assert_eq!(scale.min, 0.5);
        assert_eq!(scale.max, 4.0);
        assert_eq!(scale.size(4.0), 30.0);
        assert!(SizeScale::fit(Vec::<f64>::new(), SizeRange::new(1.0, 2.0)).is_none());
    }
}
