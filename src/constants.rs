//! Baseline physical constants and diffusion length scales.
//!
//! ## Accuracy
//!
//! Measured constants (ε₀, μ₀) are provided with 11-12 significant figures,
//! which is far below the discretisation error of any diffusive model.
//!
//! ## References
//!
//! - NIST Reference on Constants, Units, and Uncertainty: <https://physics.nist.gov/cuu/Constants/>
//! - Ward, S. H., & Hohmann, G. W. (1988). Electromagnetic theory for geophysical
//!   applications. In *Electromagnetic Methods in Applied Geophysics*, Vol. 1, SEG.

use std::f64::consts::PI;

/// Vacuum permittivity ε₀ in farads per meter (F/m).
/// Approximate value: 8.8541878128 × 10⁻¹² F/m (11 significant figures).
pub const VACUUM_PERMITTIVITY: f64 = 8.854_187_812_8e-12;
/// Vacuum permeability μ₀ in henries per meter (H/m).
/// Approximate value: 1.25663706212 × 10⁻⁶ H/m (12 significant figures).
pub const VACUUM_PERMEABILITY: f64 = 1.256_637_062_12e-6;

/// Returns the angular frequency corresponding to a linear frequency `hz`.
#[inline]
#[must_use]
pub fn angular_frequency(hz: f64) -> f64 {
    2.0 * PI * hz
}

/// Skin depth δ = √(2ρ / (ωμ₀)) in meters for resistivity `resistivity` (Ω·m).
///
/// This is the classic `≈ 503.3 √(ρ/f)` rule.
#[inline]
#[must_use]
pub fn skin_depth(frequency_hz: f64, resistivity: f64) -> f64 {
    (2.0 * resistivity / (angular_frequency(frequency_hz) * VACUUM_PERMEABILITY)).sqrt()
}

/// Wavelength of the diffusive field, 2πδ, in meters.
#[inline]
#[must_use]
pub fn diffusive_wavelength(frequency_hz: f64, resistivity: f64) -> f64 {
    2.0 * PI * skin_depth(frequency_hz, resistivity)
}
