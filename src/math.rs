//! Shared numerical primitives anchored on `nalgebra`.

use nalgebra::Vector3;

/// Primary scalar type used across the crate.
pub type Scalar = f64;
/// Convenient alias for three-dimensional real vectors.
pub type R3 = Vector3<Scalar>;
/// Primary complex scalar type used for phasors.
pub type CScalar = num_complex::Complex<Scalar>;
/// Convenient alias for three-dimensional complex vectors.
pub type C3 = Vector3<CScalar>;

/// Imaginary unit.
pub const J: CScalar = CScalar::new(0.0, 1.0);

/// Unit vector for an orientation given in degrees.
///
/// Azimuth is measured anticlockwise from +x in the horizontal plane, elevation
/// upwards from the horizontal (z is positive up).
#[must_use]
pub fn direction(azimuth_deg: Scalar, elevation_deg: Scalar) -> R3 {
    let (sa, ca) = azimuth_deg.to_radians().sin_cos();
    let (se, ce) = elevation_deg.to_radians().sin_cos();
    R3::new(ca * ce, sa * ce, se)
}

/// Inverse of [`direction`]: azimuth and elevation (degrees) of a non-zero vector.
#[must_use]
pub fn orientation(vector: &R3) -> (Scalar, Scalar) {
    let horizontal = vector.x.hypot(vector.y);
    let azimuth = vector.y.atan2(vector.x).to_degrees();
    let elevation = vector.z.atan2(horizontal).to_degrees();
    (azimuth, elevation)
}

/// Generates `n` linearly spaced samples in [start, stop].
#[must_use]
pub fn linspace(start: Scalar, stop: Scalar, n: usize) -> Vec<Scalar> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n as Scalar - 1.0);
            (0..n).map(|i| start + step * i as Scalar).collect()
        }
    }
}

/// Values `start, start + step, …` strictly below `stop` (above for negative steps).
#[must_use]
pub fn arange(start: Scalar, stop: Scalar, step: Scalar) -> Vec<Scalar> {
    if step == 0.0 || !((stop - start) / step).is_finite() {
        return Vec::new();
    }
    let n = ((stop - start) / step).ceil().max(0.0) as usize;
    (0..n).map(|i| start + step * i as Scalar).collect()
}

/// Gauss–Legendre nodes and weights on [-1, 1].
///
/// Roots are found by Newton iteration on the three-term recurrence; `n = 0`
/// returns empty vectors.
#[must_use]
pub fn gauss_legendre(n: usize) -> (Vec<Scalar>, Vec<Scalar>) {
    let mut nodes = vec![0.0; n];
    let mut weights = vec![0.0; n];
    let nf = n as Scalar;

    for i in 0..n.div_ceil(2) {
        let mut x = (std::f64::consts::PI * (i as Scalar + 0.75) / (nf + 0.5)).cos();
        for _ in 0..100 {
            let (p, p_prev) = legendre_pair(n, x);
            let dp = nf * (x * p - p_prev) / (x * x - 1.0);
            let dx = p / dp;
            x -= dx;
            if dx.abs() < 1.0e-15 {
                break;
            }
        }
        let (p, p_prev) = legendre_pair(n, x);
        let dp = nf * (x * p - p_prev) / (x * x - 1.0);
        let w = 2.0 / ((1.0 - x * x) * dp * dp);
        nodes[i] = -x;
        nodes[n - 1 - i] = x;
        weights[i] = w;
        weights[n - 1 - i] = w;
    }

    (nodes, weights)
}

/// Returns (P_n(x), P_{n-1}(x)).
fn legendre_pair(n: usize, x: Scalar) -> (Scalar, Scalar) {
    let mut p_prev = 1.0;
    let mut p = x;
    if n == 0 {
        return (1.0, 0.0);
    }
    for k in 2..=n {
        let kf = k as Scalar;
        let next = ((2.0 * kf - 1.0) * x * p - (kf - 1.0) * p_prev) / kf;
        p_prev = p;
        p = next;
    }
    (p, p_prev)
}
