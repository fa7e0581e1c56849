//! Sources and receiver grids.
//!
//! Every source is represented as a set of straight electric wire segments.
//! A magnetic dipole is realised as a small square loop of electric wire
//! perpendicular to the dipole axis, with the loop area equal to the dipole
//! length, so both forward solvers see exactly the same current system.

use std::fmt;

use crate::math::{direction, orientation, Scalar, R3};

/// Straight wire carrying a uniform current from `start` to `end`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// First end point (m).
    pub start: R3,
    /// Second end point (m).
    pub end: R3,
    /// Current in amperes, flowing from `start` to `end`.
    pub current: Scalar,
}

impl Segment {
    /// Wire length in meters.
    #[must_use]
    pub fn length(&self) -> Scalar {
        (self.end - self.start).norm()
    }

    /// Electric dipole moment `I · (end − start)` in A·m.
    #[must_use]
    pub fn moment(&self) -> R3 {
        (self.end - self.start) * self.current
    }

    /// Point at parameter `t ∈ [-1, 1]` along the segment.
    #[must_use]
    pub fn point_at(&self, t: Scalar) -> R3 {
        self.start + (self.end - self.start) * (0.5 * (t + 1.0))
    }
}

/// Transmitter description.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// Electric dipole of finite `length` centred at `center`.
    ElectricDipole {
        /// Centre (m).
        center: R3,
        /// Azimuth in degrees.
        azimuth: Scalar,
        /// Elevation in degrees.
        elevation: Scalar,
        /// Dipole length (m).
        length: Scalar,
        /// Source current (A).
        strength: Scalar,
    },
    /// Electric wire between two points.
    ElectricBipole {
        /// First end point (m).
        start: R3,
        /// Second end point (m).
        end: R3,
        /// Source current (A).
        strength: Scalar,
    },
    /// Magnetic dipole realised as a square electric loop of area `length`.
    MagneticDipole {
        /// Loop centre (m).
        center: R3,
        /// Azimuth of the dipole axis in degrees.
        azimuth: Scalar,
        /// Elevation of the dipole axis in degrees.
        elevation: Scalar,
        /// Dipole length; equals the loop area in m².
        length: Scalar,
        /// Loop current (A).
        strength: Scalar,
    },
}

impl Source {
    /// Magnetic dipole from bipole coordinates `[x1, x2, y1, y2, z1, z2]`.
    #[must_use]
    pub fn magnetic_from_bipole(coordinates: [Scalar; 6], strength: Scalar) -> Self {
        let (center, azimuth, elevation, length) = bipole_geometry(coordinates);
        Self::MagneticDipole {
            center,
            azimuth,
            elevation,
            length,
            strength,
        }
    }

    /// Electric bipole from coordinates `[x1, x2, y1, y2, z1, z2]`.
    #[must_use]
    pub fn electric_from_bipole(coordinates: [Scalar; 6], strength: Scalar) -> Self {
        let [x1, x2, y1, y2, z1, z2] = coordinates;
        Self::ElectricBipole {
            start: R3::new(x1, y1, z1),
            end: R3::new(x2, y2, z2),
            strength,
        }
    }

    /// Centre of the source.
    #[must_use]
    pub fn center(&self) -> R3 {
        match self {
            Self::ElectricDipole { center, .. } | Self::MagneticDipole { center, .. } => *center,
            Self::ElectricBipole { start, end, .. } => (start + end) * 0.5,
        }
    }

    /// Source strength in amperes.
    #[must_use]
    pub fn strength(&self) -> Scalar {
        match self {
            Self::ElectricDipole { strength, .. }
            | Self::ElectricBipole { strength, .. }
            | Self::MagneticDipole { strength, .. } => *strength,
        }
    }

    /// True for sources built from a closed loop.
    #[must_use]
    pub const fn is_magnetic(&self) -> bool {
        matches!(self, Self::MagneticDipole { .. })
    }

    /// Checks that lengths and strengths are finite and non-degenerate.
    pub fn validate(&self) -> Result<(), String> {
        let finite = |v: &R3| v.iter().all(|c| c.is_finite());
        match self {
            Self::ElectricDipole { center, length, .. }
            | Self::MagneticDipole { center, length, .. } => {
                if !finite(center) {
                    return Err(format!("source centre must be finite, got {center:?}"));
                }
                if !(length.is_finite() && *length > 0.0) {
                    return Err(format!("source length must be positive, got {length}"));
                }
            }
            Self::ElectricBipole { start, end, .. } => {
                if !(finite(start) && finite(end)) || (end - start).norm() == 0.0 {
                    return Err("bipole end points must be finite and distinct".into());
                }
            }
        }
        let strength = self.strength();
        if !(strength.is_finite() && strength != 0.0) {
            return Err(format!("source strength must be finite and non-zero, got {strength}"));
        }
        Ok(())
    }

    /// Wire segments carrying the source current.
    #[must_use]
    pub fn segments(&self) -> Vec<Segment> {
        match *self {
            Self::ElectricDipole {
                center,
                azimuth,
                elevation,
                length,
                strength,
            } => {
                let half = direction(azimuth, elevation) * (0.5 * length);
                vec![Segment {
                    start: center - half,
                    end: center + half,
                    current: strength,
                }]
            }
            Self::ElectricBipole { start, end, strength } => vec![Segment {
                start,
                end,
                current: strength,
            }],
            Self::MagneticDipole {
                center,
                azimuth,
                elevation,
                length,
                strength,
            } => square_loop(center, direction(azimuth, elevation), length, strength),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = self.center();
        match self {
            Self::ElectricDipole {
                azimuth,
                elevation,
                length,
                strength,
                ..
            } => write!(
                f,
                "ElectricDipole: {strength:.3} A; center={{{:.1}; {:.1}; {:.1}}} m; \
                 θ={azimuth:.1}°, φ={elevation:.1}°; l={length:.3} m",
                c.x, c.y, c.z
            ),
            Self::ElectricBipole { start, end, strength } => write!(
                f,
                "ElectricBipole: {strength:.3} A; {{{:.1}; {:.1}; {:.1}}} → {{{:.1}; {:.1}; {:.1}}} m",
                start.x, start.y, start.z, end.x, end.y, end.z
            ),
            Self::MagneticDipole {
                azimuth,
                elevation,
                length,
                strength,
                ..
            } => write!(
                f,
                "MagneticDipole (electric loop): {strength:.3} A; center={{{:.1}; {:.1}; {:.1}}} m; \
                 θ={azimuth:.1}°, φ={elevation:.1}°; area={length:.3} m²",
                c.x, c.y, c.z
            ),
        }
    }
}

/// Centre, azimuth, elevation and length of a bipole.
fn bipole_geometry(coordinates: [Scalar; 6]) -> (R3, Scalar, Scalar, Scalar) {
    let [x1, x2, y1, y2, z1, z2] = coordinates;
    let start = R3::new(x1, y1, z1);
    let end = R3::new(x2, y2, z2);
    let axis = end - start;
    let (azimuth, elevation) = orientation(&axis);
    ((start + end) * 0.5, azimuth, elevation, axis.norm())
}

/// Square loop of area `area` normal to `axis`, current right-handed about it.
fn square_loop(center: R3, axis: R3, area: Scalar, current: Scalar) -> Vec<Segment> {
    let n = axis.normalize();
    let cross = n.cross(&R3::z());
    let u = if cross.norm() > 1.0e-8 {
        cross.normalize()
    } else {
        R3::x()
    };
    let v = n.cross(&u);
    let half = 0.5 * area.sqrt();

    let corners = [(1.0, -1.0), (1.0, 1.0), (-1.0, 1.0), (-1.0, -1.0)]
        .map(|(su, sv)| center + (u * su + v * sv) * half);

    (0..4)
        .map(|i| Segment {
            start: corners[i],
            end: corners[(i + 1) % 4],
            current,
        })
        .collect()
}

/// Regular receiver grid at constant depth with a common orientation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiverGrid {
    /// Inline coordinates (columns).
    pub x: Vec<Scalar>,
    /// Crossline coordinates (rows).
    pub y: Vec<Scalar>,
    /// Receiver depth (m, positive up).
    pub z: Scalar,
    /// Azimuth of the receiver orientation in degrees.
    pub azimuth: Scalar,
    /// Elevation of the receiver orientation in degrees.
    pub elevation: Scalar,
}

impl ReceiverGrid {
    /// Grid of `x × y` receivers at depth `z`.
    #[must_use]
    pub const fn new(x: Vec<Scalar>, y: Vec<Scalar>, z: Scalar, azimuth: Scalar, elevation: Scalar) -> Self {
        Self {
            x,
            y,
            z,
            azimuth,
            elevation,
        }
    }

    /// `(rows, columns)` = `(ny, nx)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.y.len(), self.x.len())
    }

    /// Number of receivers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.x.len() * self.y.len()
    }

    /// True if the grid has no receivers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receiver at (`row`, `col`).
    #[must_use]
    pub fn point(&self, row: usize, col: usize) -> R3 {
        R3::new(self.x[col], self.y[row], self.z)
    }

    /// Unit vector onto which fields are projected.
    #[must_use]
    pub fn direction(&self) -> R3 {
        direction(self.azimuth, self.elevation)
    }

    /// Checks that the grid is non-empty and finite.
    pub fn validate(&self) -> Result<(), String> {
        if self.is_empty() {
            return Err("receiver grid is empty".into());
        }
        let finite = self.x.iter().chain(&self.y).all(|v| v.is_finite())
            && self.z.is_finite()
            && self.azimuth.is_finite()
            && self.elevation.is_finite();
        if !finite {
            return Err("receiver coordinates and angles must be finite".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn loop_moment(segments: &[Segment]) -> R3 {
        // m = I/2 ∮ r × dl
        segments.iter().fold(R3::zeros(), |acc, s| {
            let mid = (s.start + s.end) * 0.5;
            acc + mid.cross(&(s.end - s.start)) * (0.5 * s.current)
        })
    }

    #[test]
    fn magnetic_dipole_from_bipole_matches_geometry() {
        let source =
            Source::magnetic_from_bipole([-0.5, 0.5, -0.3, 0.3, -300.5, -299.5], std::f64::consts::PI);
        let Source::MagneticDipole {
            center, length, ..
        } = source
        else {
            panic!("expected magnetic dipole");
        };
        assert_relative_eq!(center, R3::new(0.0, 0.0, -300.0), epsilon = 1.0e-12);
        assert_relative_eq!(length, 2.36_f64.sqrt(), epsilon = 1.0e-12);
    }

    #[test]
    fn loop_moment_points_along_axis_with_area_equal_to_length() {
        let source = Source::MagneticDipole {
            center: R3::new(10.0, -5.0, -300.0),
            azimuth: 30.0,
            elevation: 40.0,
            length: 2.0,
            strength: 3.0,
        };
        let segments = source.segments();
        assert_eq!(segments.len(), 4);
        let m = loop_moment(&segments);
        let expected = direction(30.0, 40.0) * (2.0 * 3.0);
        assert_relative_eq!(m, expected, epsilon = 1.0e-9);
        let side = segments[0].length();
        assert_relative_eq!(side * side, 2.0, epsilon = 1.0e-12);
    }

    #[test]
    fn vertical_loop_axis_is_handled() {
        let source = Source::MagneticDipole {
            center: R3::zeros(),
            azimuth: 0.0,
            elevation: 90.0,
            length: 1.0,
            strength: 1.0,
        };
        let m = loop_moment(&source.segments());
        assert_relative_eq!(m, R3::z(), epsilon = 1.0e-9);
    }

    #[test]
    fn electric_dipole_is_single_segment() {
        let source = Source::ElectricDipole {
            center: R3::zeros(),
            azimuth: 90.0,
            elevation: 0.0,
            length: 4.0,
            strength: 2.0,
        };
        let segments = source.segments();
        assert_eq!(segments.len(), 1);
        assert_relative_eq!(segments[0].moment(), R3::new(0.0, 8.0, 0.0), epsilon = 1.0e-12);
    }

    #[test]
    fn validation_rejects_degenerate_sources() {
        let source = Source::electric_from_bipole([0.0, 0.0, 0.0, 0.0, 0.0, 0.0], 1.0);
        assert!(source.validate().is_err());
        let source = Source::magnetic_from_bipole([0.0, 1.0, 0.0, 0.0, 0.0, 0.0], 0.0);
        assert!(source.validate().is_err());
    }

    #[test]
    fn receiver_grid_is_row_major() {
        let grid = ReceiverGrid::new(vec![1.0, 2.0, 3.0], vec![-1.0, 1.0], -400.0, 0.0, 0.0);
        assert_eq!(grid.shape(), (2, 3));
        assert_eq!(grid.len(), 6);
        assert_relative_eq!(grid.point(1, 2), R3::new(3.0, 1.0, -400.0));
        assert!(grid.validate().is_ok());
    }
}
