//! Closed-form diffusive fields in a homogeneous VTI fullspace.
//!
//! With `ζ = -iωμ₀` the electric field of a point electric dipole `p` at the
//! origin is `E = G p` and its magnetic field is `H = Γ p`. The tensors are
//! built from a TE potential with the horizontal propagation constant
//! `γh = √(ζσh)`,
//!
//! ```text
//! gTE = e^{-γh r} / (4π r)
//! ```
//!
//! and a TM potential on the stretched distance `R = √(x² + y² + λ²z²)`,
//!
//! ```text
//! gTM = e^{-γv R} / (4π √(σh σv) R),     γv = √(ζσv)
//! ```
//!
//! coupled by the horizontal Hessian `P = ∇h∇h Ψ` of the potential whose
//! radial derivative is `Q/ρ`, with `Q = (e^{-γv R} - e^{-γh r}) / (4π γh)`.
//! For `λ = 1` everything collapses to the familiar isotropic dyadic
//! `G = -ζ (I - ∇∇/(ζσ)) g`.
//!
//! ## References
//!
//! - Ward, S. H., & Hohmann, G. W. (1988). Electromagnetic theory for geophysical
//!   applications. In *Electromagnetic Methods in Applied Geophysics*, Vol. 1, SEG.
//! - Moran, J. H., & Gianzero, S. (1979). Effects of formation anisotropy on
//!   resistivity-logging measurements. *Geophysics*, 44(7), 1266-1286.

use std::f64::consts::PI;

use nalgebra::Matrix3;

use crate::constants::{angular_frequency, VACUUM_PERMEABILITY};
use crate::fields::FieldKind;
use crate::materials::VtiResistivity;
use crate::math::{gauss_legendre, CScalar, Scalar, C3, J, R3};
use crate::survey::Segment;

/// Below this ratio of horizontal offset to distance the on-axis limit of the
/// coupling term is used instead of the cancelling difference.
const AXIS_TOLERANCE: Scalar = 1.0e-4;

/// Value, gradient and Hessian of a scaled `e^{-γR}/R` kernel.
#[derive(Debug, Clone, Copy)]
struct Kernel {
    value: CScalar,
    gradient: C3,
    hessian: Matrix3<CScalar>,
}

impl Kernel {
    /// Evaluates `scale · e^{-γR}/R` with `R² = x² + y² + λ²z²`.
    fn new(r: &R3, gamma: CScalar, lambda: Scalar, scale: Scalar) -> Self {
        let l2 = lambda * lambda;
        let metric = R3::new(1.0, 1.0, l2);
        let big_r = (r.x * r.x + r.y * r.y + l2 * r.z * r.z).sqrt();
        let s = R3::new(r.x / big_r, r.y / big_r, l2 * r.z / big_r);

        let gr = gamma * big_r;
        let decay = (-gr).exp() * scale;
        let r3 = big_r * big_r * big_r;
        let first = -(gr + 1.0) * decay / (big_r * big_r);
        let radial = (gr * gr + gr * 3.0 + 3.0) * decay / r3;
        let diagonal = -(gr + 1.0) * decay / r3;

        Self {
            value: decay / big_r,
            gradient: C3::from_fn(|i, _| first * s[i]),
            hessian: Matrix3::from_fn(|i, j| {
                let h = radial * (s[i] * s[j]);
                if i == j {
                    h + diagonal * metric[i]
                } else {
                    h
                }
            }),
        }
    }
}

/// Potentials and coupling terms shared by the electric and magnetic tensors.
struct Terms {
    te: Kernel,
    tm: Kernel,
    /// Horizontal coupling `P_ij`.
    coupling: [[CScalar; 2]; 2],
    /// `∂z P_ij`.
    coupling_dz: [[CScalar; 2]; 2],
}

/// Green's tensors of a homogeneous VTI fullspace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FullspaceGreen {
    zeta: CScalar,
    sigma_h: Scalar,
    sigma_v: Scalar,
    lambda: Scalar,
    gamma_h: CScalar,
    gamma_v: CScalar,
}

impl FullspaceGreen {
    /// Green's tensors for `frequency` (Hz) in the medium `resistivity`.
    #[must_use]
    pub fn new(frequency: Scalar, resistivity: &VtiResistivity) -> Self {
        let zeta = -J * (angular_frequency(frequency) * VACUUM_PERMEABILITY);
        let sigma_h = resistivity.conductivity_h();
        let sigma_v = resistivity.conductivity_v();
        Self {
            zeta,
            sigma_h,
            sigma_v,
            lambda: resistivity.anisotropy,
            gamma_h: (zeta * sigma_h).sqrt(),
            gamma_v: (zeta * sigma_v).sqrt(),
        }
    }

    /// Impedivity ζ = -iωμ₀.
    #[must_use]
    pub const fn zeta(&self) -> CScalar {
        self.zeta
    }

    fn terms(&self, r: &R3) -> Terms {
        let four_pi = 4.0 * PI;
        let te = Kernel::new(r, self.gamma_h, 1.0, 1.0 / four_pi);
        let tm = Kernel::new(
            r,
            self.gamma_v,
            self.lambda,
            1.0 / (four_pi * (self.sigma_h * self.sigma_v).sqrt()),
        );

        let f = te.value - tm.value * self.sigma_v;
        let f_z = te.gradient[2] - tm.gradient[2] * self.sigma_v;

        let rho = r.x.hypot(r.y);
        let distance = r.norm();
        let zero = CScalar::new(0.0, 0.0);
        let mut coupling = [[zero; 2]; 2];
        let mut coupling_dz = [[zero; 2]; 2];

        if rho <= AXIS_TOLERANCE * distance {
            for i in 0..2 {
                coupling[i][i] = f * 0.5;
                coupling_dz[i][i] = f_z * 0.5;
            }
        } else {
            let l2 = self.lambda * self.lambda;
            let big_r = (rho * rho + l2 * r.z * r.z).sqrt();
            let e_h = (-self.gamma_h * distance).exp();
            let e_v = (-self.gamma_v * big_r).exp();
            let q = (e_v - e_h) / (self.gamma_h * four_pi);
            let q_z = (e_h / distance - self.gamma_v / self.gamma_h * (l2 / big_r) * e_v) * (r.z / four_pi);

            let unit = [r.x / rho, r.y / rho];
            let rho2 = rho * rho;
            for i in 0..2 {
                for j in 0..2 {
                    let outer = unit[i] * unit[j];
                    let delta = if i == j { 1.0 } else { 0.0 };
                    coupling[i][j] = q * ((delta - 2.0 * outer) / rho2) + f * outer;
                    coupling_dz[i][j] = q_z * ((delta - 2.0 * outer) / rho2) + f_z * outer;
                }
            }
        }

        Terms {
            te,
            tm,
            coupling,
            coupling_dz,
        }
    }

    /// Electric tensor `G(r)`; `r` is receiver minus source position.
    #[must_use]
    pub fn electric(&self, r: &R3) -> Matrix3<CScalar> {
        let Terms { te, tm, coupling, .. } = self.terms(r);
        let mut g = tm.hessian;
        for i in 0..2 {
            for j in 0..2 {
                g[(i, j)] += self.zeta * coupling[i][j];
            }
            g[(i, i)] -= self.zeta * te.value;
        }
        g[(2, 2)] -= self.zeta * self.sigma_h * tm.value;
        g
    }

    /// Magnetic tensor `Γ(r)`; `r` is receiver minus source position.
    #[must_use]
    pub fn magnetic(&self, r: &R3) -> Matrix3<CScalar> {
        let Terms {
            te,
            tm,
            coupling_dz: dp,
            ..
        } = self.terms(r);
        let dte = te.gradient;
        let dtm = tm.gradient * CScalar::new(self.sigma_h, 0.0);
        let zero = CScalar::new(0.0, 0.0);

        Matrix3::new(
            dp[0][1],
            -dte[2] + dp[1][1],
            dtm[1],
            dte[2] - dp[0][0],
            -dp[0][1],
            -dtm[0],
            -dte[1],
            dte[0],
            zero,
        )
    }

    /// Tensor for the requested field kind.
    #[must_use]
    pub fn tensor(&self, kind: FieldKind, r: &R3) -> Matrix3<CScalar> {
        match kind {
            FieldKind::Electric => self.electric(r),
            FieldKind::Magnetic => self.magnetic(r),
        }
    }
}

/// Gauss–Legendre integration of the Green's tensors along wire segments.
///
/// Segments are split into pieces no longer than half their distance to the
/// receiver so the quadrature stays accurate close to the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct WireIntegrator {
    nodes: Vec<Scalar>,
    weights: Vec<Scalar>,
    max_subdivisions: usize,
}

impl Default for WireIntegrator {
    fn default() -> Self {
        Self::new(7)
    }
}

impl WireIntegrator {
    /// Integrator with `order` quadrature points per piece.
    #[must_use]
    pub fn new(order: usize) -> Self {
        let (nodes, weights) = gauss_legendre(order.max(1));
        Self {
            nodes,
            weights,
            max_subdivisions: 64,
        }
    }

    /// Field at `receiver` radiated by all `segments`.
    #[must_use]
    pub fn field(&self, green: &FullspaceGreen, kind: FieldKind, segments: &[Segment], receiver: &R3) -> C3 {
        segments.iter().fold(C3::zeros(), |acc, segment| {
            acc + self.segment_field(green, kind, segment, receiver)
        })
    }

    fn segment_field(&self, green: &FullspaceGreen, kind: FieldKind, segment: &Segment, receiver: &R3) -> C3 {
        let length = segment.length();
        if length == 0.0 {
            return C3::zeros();
        }
        let midpoint = segment.point_at(0.0);
        let distance = (receiver - midpoint).norm();
        let pieces = ((2.0 * length / distance).ceil() as usize).clamp(1, self.max_subdivisions);

        let moment = segment.moment().map(|c| CScalar::new(c / pieces as Scalar, 0.0));
        let step = (segment.end - segment.start) / pieces as Scalar;

        let mut total = C3::zeros();
        for piece in 0..pieces {
            let start = segment.start + step * piece as Scalar;
            for (t, w) in self.nodes.iter().zip(&self.weights) {
                let x = start + step * (0.5 * (t + 1.0));
                let tensor = green.tensor(kind, &(receiver - x));
                total += tensor * moment * CScalar::new(0.5 * w, 0.0);
            }
        }
        total
    }
}
