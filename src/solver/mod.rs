//! Sparse linear system solvers for the staggered-grid EM system.
//!
//! The discrete curl-curl operator is complex symmetric and indefinite, so
//! Krylov methods for general non-Hermitian systems are used: BiCGSTAB and
//! restarted GMRES, both with optional Jacobi (diagonal) preconditioning.
//!
//! # References
//!
//! - van der Vorst (2003). "Iterative Krylov Methods for Large Linear Systems".
//!   Cambridge University Press.
//! - Saad (2003). "Iterative Methods for Sparse Linear Systems" (2nd ed).
//!   SIAM, Philadelphia.

pub mod assembly;
pub mod iterative;

pub use assembly::{assemble_system, edge_conductance, source_vector, SystemBuilder};
pub use iterative::{BiCGSTAB, ConvergenceCriteria, Jacobi, GMRES};

use std::time::Duration;

use nalgebra::DVector;
use nalgebra_sparse::CscMatrix;
use serde::{Deserialize, Serialize};

use crate::math::{CScalar, Scalar};

/// Error types for sparse solvers.
#[derive(Debug, Clone, PartialEq)]
pub enum SolverError {
    /// Matrix is singular or has a zero on the diagonal.
    SingularMatrix,
    /// Iterative solver failed to converge within maximum iterations.
    ConvergenceFailure {
        /// Number of iterations completed before failure.
        iterations: usize,
        /// Final residual norm at termination.
        residual_norm: Scalar,
    },
    /// Matrix structure is invalid or inconsistent.
    InvalidMatrix(String),
    /// Numerical breakdown during iteration.
    NumericalInstability(String),
    /// Other solver-specific errors.
    Other(String),
}

impl std::fmt::Display for SolverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SingularMatrix => write!(f, "Matrix is singular"),
            Self::ConvergenceFailure {
                iterations,
                residual_norm,
            } => {
                write!(
                    f,
                    "Failed to converge after {} iterations (residual: {:.2e})",
                    iterations, residual_norm
                )
            }
            Self::InvalidMatrix(msg) => write!(f, "Invalid matrix: {}", msg),
            Self::NumericalInstability(msg) => write!(f, "Numerical instability: {}", msg),
            Self::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for SolverError {}

/// Statistics and diagnostics from a sparse solver execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolverStats {
    /// True if the solve succeeded.
    pub success: bool,
    /// Number of nonzeros in the system matrix.
    pub nnz_matrix: usize,
    /// Time spent iterating.
    pub solve_time: Option<Duration>,
    /// Number of iterations (matrix-vector products for GMRES, steps for BiCGSTAB).
    pub iterations: Option<usize>,
    /// Final residual norm.
    pub residual_norm: Option<Scalar>,
    /// Memory used by the work vectors in bytes (estimate).
    pub memory_bytes: Option<usize>,
    /// Human-readable solver-specific notes.
    pub notes: Vec<String>,
}

/// Trait for sparse linear system solvers: solve Ax = b for sparse A.
///
/// 1. **Symbolic Phase**: check structure, record dimensions.
/// 2. **Numeric Phase**: store the matrix and build the preconditioner.
/// 3. **Solve Phase**: iterate on a right-hand side.
pub trait SparseSolver {
    /// Analyzes the matrix structure.
    fn symbolic(&mut self, matrix: &CscMatrix<CScalar>) -> Result<(), SolverError>;

    /// Prepares the solver (and its preconditioner) for `matrix`.
    ///
    /// The structure must match the one passed to [`SparseSolver::symbolic`].
    fn numeric(&mut self, matrix: &CscMatrix<CScalar>) -> Result<(), SolverError>;

    /// Solves Ax = b.
    fn solve(&self, rhs: &DVector<CScalar>) -> Result<DVector<CScalar>, SolverError>;

    /// Solves the system and returns detailed statistics.
    fn solve_with_stats(
        &self,
        rhs: &DVector<CScalar>,
    ) -> Result<(DVector<CScalar>, SolverStats), SolverError> {
        let start = std::time::Instant::now();
        let solution = self.solve(rhs)?;
        let stats = SolverStats {
            success: true,
            solve_time: Some(start.elapsed()),
            ..Default::default()
        };
        Ok((solution, stats))
    }

    /// Returns solver name for logging/debugging.
    fn name(&self) -> &str;

    /// Returns true if this solver has been prepared and is ready to solve.
    fn is_ready(&self) -> bool;
}

/// Krylov method used for the numerical forward model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverMethod {
    /// Bi-Conjugate Gradient Stabilized.
    #[default]
    Bicgstab,
    /// Restarted GMRES.
    Gmres,
}

/// Solver selection plus convergence settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverOptions {
    /// Krylov method.
    pub method: SolverMethod,
    /// Stopping criteria.
    pub criteria: ConvergenceCriteria,
    /// Krylov subspace dimension for GMRES.
    pub restart: usize,
    /// Apply Jacobi preconditioning.
    pub jacobi: bool,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            method: SolverMethod::Bicgstab,
            criteria: ConvergenceCriteria {
                max_iterations: 20_000,
                relative_tolerance: 1.0e-7,
                absolute_tolerance: 1.0e-30,
            },
            restart: 50,
            jacobi: true,
        }
    }
}

impl SolverOptions {
    /// Instantiates the configured solver.
    #[must_use]
    pub fn build(&self) -> Box<dyn SparseSolver> {
        match self.method {
            SolverMethod::Bicgstab => {
                Box::new(BiCGSTAB::new(self.criteria).with_jacobi(self.jacobi))
            }
            SolverMethod::Gmres => {
                Box::new(GMRES::new(self.restart, self.criteria).with_jacobi(self.jacobi))
            }
        }
    }
}

/// Matrix-vector product for CSC sparse matrices with complex values.
pub(crate) fn matvec(matrix: &CscMatrix<CScalar>, x: &DVector<CScalar>) -> DVector<CScalar> {
    let mut y = DVector::zeros(matrix.nrows());
    let offsets = matrix.col_offsets();
    let rows = matrix.row_indices();
    let values = matrix.values();
    for col in 0..matrix.ncols() {
        let xc = x[col];
        for idx in offsets[col]..offsets[col + 1] {
            y[rows[idx]] += values[idx] * xc;
        }
    }
    y
}

/// Computes complex inner product: ⟨x, y⟩ = Σᵢ conj(xᵢ) * yᵢ
pub(crate) fn complex_dot(x: &DVector<CScalar>, y: &DVector<CScalar>) -> CScalar {
    x.iter().zip(y.iter()).map(|(xi, yi)| xi.conj() * yi).sum()
}

#[cfg(test)]
mod tests {
    use nalgebra_sparse::coo::CooMatrix;

    use super::*;

    #[test]
    fn matvec_matches_dense_product() {
        let mut coo = CooMatrix::new(3, 3);
        coo.push(0, 0, CScalar::new(2.0, 1.0));
        coo.push(0, 2, CScalar::new(-1.0, 0.0));
        coo.push(1, 1, CScalar::new(0.0, 3.0));
        coo.push(2, 0, CScalar::new(1.0, -1.0));
        coo.push(2, 0, CScalar::new(1.0, 0.0));
        let matrix = CscMatrix::from(&coo);
        let x = DVector::from_vec(vec![
            CScalar::new(1.0, 0.0),
            CScalar::new(0.0, 1.0),
            CScalar::new(2.0, 0.0),
        ]);
        let y = matvec(&matrix, &x);
        assert_eq!(y[0], CScalar::new(0.0, 1.0));
        assert_eq!(y[1], CScalar::new(-3.0, 0.0));
        // Duplicate triplets are summed.
        assert_eq!(y[2], CScalar::new(2.0, -1.0));
    }

    #[test]
    fn solver_options_build_named_solvers() {
        let mut options = SolverOptions::default();
        assert_eq!(options.build().name(), "BiCGSTAB");
        options.method = SolverMethod::Gmres;
        assert_eq!(options.build().name(), "GMRES");
        assert!(!options.build().is_ready());
    }

    #[test]
    fn display_includes_iteration_count() {
        let err = SolverError::ConvergenceFailure {
            iterations: 12,
            residual_norm: 1.5e-3,
        };
        assert_eq!(
            err.to_string(),
            "Failed to converge after 12 iterations (residual: 1.50e-3)"
        );
    }
}
