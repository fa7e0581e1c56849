//! Relative error between a reference and a candidate dataset.
//!
//! Errors are `100 · |(a − b) / a|` in percent, computed separately for the
//! real and imaginary channels with `a` the reference. Where the reference
//! channel is exactly zero the result is non-finite and kept as is.

use nalgebra::DMatrix;
use tracing::warn;

use crate::fields::ReceiverData;
use crate::math::Scalar;
use crate::simulation::SimulationError;
use crate::survey::ReceiverGrid;

/// Per-receiver relative errors in percent, shape `(ny, nx)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonResult {
    /// Error of the real parts.
    pub real: DMatrix<Scalar>,
    /// Error of the imaginary parts.
    pub imag: DMatrix<Scalar>,
}

/// Elementwise relative error of `candidate` with respect to `reference`.
///
/// The operation is not symmetric in its arguments.
pub fn relative_error(
    reference: &ReceiverData,
    candidate: &ReceiverData,
) -> Result<ComparisonResult, SimulationError> {
    if reference.shape() != candidate.shape() {
        return Err(SimulationError::ShapeMismatch {
            expected: reference.shape(),
            found: candidate.shape(),
        });
    }
    let percent = |a: Scalar, b: Scalar| 100.0 * ((a - b) / a).abs();
    let real = reference.real().zip_map(&candidate.real(), percent);
    let imag = reference.imag().zip_map(&candidate.imag(), percent);

    let result = ComparisonResult { real, imag };
    let non_finite = result.non_finite_count();
    if non_finite > 0 {
        warn!(non_finite, kind = reference.kind.label(), "relative error has non-finite entries");
    }
    Ok(result)
}

impl ComparisonResult {
    /// `(rows, columns)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        self.real.shape()
    }

    /// Number of non-finite entries over both channels.
    #[must_use]
    pub fn non_finite_count(&self) -> usize {
        self.real
            .iter()
            .chain(self.imag.iter())
            .filter(|v| !v.is_finite())
            .count()
    }

    /// Statistics of the real and imaginary errors over the receivers of
    /// `grid` that fall inside `region`.
    #[must_use]
    pub fn region_stats(&self, grid: &ReceiverGrid, region: &Region) -> (ErrorStats, ErrorStats) {
        let (rows, cols) = self.shape();
        let mut real = Vec::new();
        let mut imag = Vec::new();
        for row in 0..rows.min(grid.y.len()) {
            for col in 0..cols.min(grid.x.len()) {
                if region.contains(grid.x[col], grid.y[row]) {
                    real.push(self.real[(row, col)]);
                    imag.push(self.imag[(row, col)]);
                }
            }
        }
        (ErrorStats::from_values(real), ErrorStats::from_values(imag))
    }
}

/// Horizontal window around a centre, optionally excluding the area close to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    /// Window centre (x, y).
    pub center: [Scalar; 2],
    /// Half-width of the square window.
    pub half_width: Scalar,
    /// Receivers closer than this to the centre are excluded.
    pub exclusion_radius: Scalar,
}

impl Region {
    /// Square window without exclusion.
    #[must_use]
    pub const fn square(center: [Scalar; 2], half_width: Scalar) -> Self {
        Self {
            center,
            half_width,
            exclusion_radius: 0.0,
        }
    }

    /// Excludes receivers within `radius` of the centre.
    #[must_use]
    pub const fn excluding(mut self, radius: Scalar) -> Self {
        self.exclusion_radius = radius;
        self
    }

    /// True if (`x`, `y`) lies in the window and outside the exclusion radius.
    #[must_use]
    pub fn contains(&self, x: Scalar, y: Scalar) -> bool {
        let (dx, dy) = (x - self.center[0], y - self.center[1]);
        dx.abs() <= self.half_width && dy.abs() <= self.half_width && dx.hypot(dy) >= self.exclusion_radius
    }
}

/// Summary of a set of relative errors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorStats {
    /// Number of samples considered.
    pub count: usize,
    /// Samples that were NaN or infinite (excluded from the figures below).
    pub non_finite: usize,
    /// Median of the finite errors (NaN if there are none).
    pub median: Scalar,
    /// Mean of the finite errors.
    pub mean: Scalar,
    /// Largest finite error.
    pub max: Scalar,
    /// Fraction of finite samples below 1 %.
    pub below_one_percent: Scalar,
}

impl ErrorStats {
    /// Summarises `values`.
    #[must_use]
    pub fn from_values(values: impl IntoIterator<Item = Scalar>) -> Self {
        let mut count = 0;
        let mut finite: Vec<Scalar> = Vec::new();
        for value in values {
            count += 1;
            if value.is_finite() {
                finite.push(value);
            }
        }
        let non_finite = count - finite.len();
        if finite.is_empty() {
            return Self {
                count,
                non_finite,
                median: Scalar::NAN,
                mean: Scalar::NAN,
                max: Scalar::NAN,
                below_one_percent: Scalar::NAN,
            };
        }
        finite.sort_by(Scalar::total_cmp);
        let n = finite.len();
        let median = if n % 2 == 1 {
            finite[n / 2]
        } else {
            0.5 * (finite[n / 2 - 1] + finite[n / 2])
        };
        Self {
            count,
            non_finite,
            median,
            mean: finite.iter().sum::<Scalar>() / n as Scalar,
            max: finite[n - 1],
            below_one_percent: finite.iter().filter(|&&v| v < 1.0).count() as Scalar / n as Scalar,
        }
    }
}

impl std::fmt::Display for ErrorStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "n={} median={:.3}% mean={:.3}% max={:.3}% <1%: {:.1}%",
            self.count,
            self.median,
            self.mean,
            self.max,
            100.0 * self.below_one_percent
        )?;
        if self.non_finite > 0 {
            write!(f, " ({} non-finite)", self.non_finite)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::fields::FieldKind;
    use crate::math::CScalar;

    fn data(values: &[(f64, f64)]) -> ReceiverData {
        ReceiverData::from_fn(FieldKind::Electric, 1, values.len(), |_, c| {
            CScalar::new(values[c].0, values[c].1)
        })
    }

    #[test]
    fn error_follows_the_formula() {
        let a = data(&[(2.0, -4.0), (1.0, 1.0)]);
        let b = data(&[(1.0, -5.0), (1.0, 1.5)]);
        let result = relative_error(&a, &b).unwrap();
        assert_relative_eq!(result.real[(0, 0)], 50.0);
        assert_relative_eq!(result.imag[(0, 0)], 25.0);
        assert_relative_eq!(result.real[(0, 1)], 0.0);
        assert_relative_eq!(result.imag[(0, 1)], 50.0);
    }

    #[test]
    fn error_is_not_symmetric() {
        let a = data(&[(2.0, 1.0)]);
        let b = data(&[(1.0, 1.0)]);
        let ab = relative_error(&a, &b).unwrap();
        let ba = relative_error(&b, &a).unwrap();
        assert_relative_eq!(ab.real[(0, 0)], 50.0);
        assert_relative_eq!(ba.real[(0, 0)], 100.0);
    }

    #[test]
    fn zero_reference_gives_non_finite_values() {
        let a = data(&[(0.0, 1.0), (0.0, 0.0)]);
        let b = data(&[(1.0, 1.0), (0.0, 0.0)]);
        let result = relative_error(&a, &b).unwrap();
        assert!(result.real[(0, 0)].is_infinite());
        assert!(result.real[(0, 1)].is_nan());
        assert!(result.imag[(0, 1)].is_nan());
        assert_eq!(result.non_finite_count(), 3);
    }

    #[test]
    fn shape_mismatch_is_an_error() {
        let a = data(&[(1.0, 1.0)]);
        let b = data(&[(1.0, 1.0), (2.0, 2.0)]);
        let err = relative_error(&a, &b).unwrap_err();
        assert!(matches!(err, SimulationError::ShapeMismatch { expected: (1, 1), found: (1, 2) }));
    }

    #[test]
    fn statistics_skip_non_finite_values() {
        let stats = ErrorStats::from_values([0.5, 3.0, f64::NAN, 2.0, 0.1, f64::INFINITY]);
        assert_eq!(stats.count, 6);
        assert_eq!(stats.non_finite, 2);
        assert_relative_eq!(stats.median, 1.25);
        assert_relative_eq!(stats.max, 3.0);
        assert_relative_eq!(stats.below_one_percent, 0.5);
    }

    #[test]
    fn region_excludes_the_centre() {
        let region = Region::square([0.0, 0.0], 100.0).excluding(30.0);
        assert!(region.contains(50.0, -50.0));
        assert!(!region.contains(10.0, 10.0));
        assert!(!region.contains(150.0, 0.0));

        let grid = ReceiverGrid::new(vec![-200.0, -50.0, 0.0, 50.0], vec![0.0, 60.0], 0.0, 0.0, 0.0);
        let result = ComparisonResult {
            real: DMatrix::from_row_slice(2, 4, &[9.0, 1.0, 9.0, 3.0, 9.0, 5.0, 2.0, 4.0]),
            imag: DMatrix::from_element(2, 4, 1.0),
        };
        let (real, imag) = result.region_stats(&grid, &region);
        assert_eq!(real.count, 5);
        assert_relative_eq!(real.median, 3.0);
        assert_relative_eq!(imag.mean, 1.0);
    }
}
