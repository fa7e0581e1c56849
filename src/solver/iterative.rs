//! Iterative Krylov subspace solvers for large sparse linear systems.
//!
//! # Solvers
//!
//! - **BiCGSTAB**: Bi-Conjugate Gradient Stabilized for nonsymmetric systems
//! - **GMRES**: Generalized Minimal Residual with restart
//!
//! Both apply the preconditioner from the right, so the reported residual is
//! the true residual `‖b − Ax‖` of the original system.
//!
//! # References
//!
//! - van der Vorst (1992). "Bi-CGSTAB: A Fast and Smoothly Converging Variant
//!   of Bi-CG for the Solution of Nonsymmetric Linear Systems". SIAM J. Sci.
//!   Stat. Comput. 13(2), 631-644.
//! - Saad & Schultz (1986). "GMRES: A Generalized Minimal Residual Algorithm
//!   for Solving Nonsymmetric Linear Systems". SIAM J. Sci. Stat. Comput. 7(3), 856-869.

use std::cell::Cell;

use nalgebra::DVector;
use nalgebra_sparse::CscMatrix;
use tracing::debug;

use super::{complex_dot, matvec, SolverError, SolverStats, SparseSolver};
use crate::math::{CScalar, Scalar};

const BREAKDOWN: Scalar = 1e-300;

/// Convergence criteria for iterative solvers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvergenceCriteria {
    /// Maximum number of iterations.
    pub max_iterations: usize,
    /// Relative tolerance: ||r||/||b|| < rel_tol.
    pub relative_tolerance: Scalar,
    /// Absolute tolerance: ||r|| < abs_tol.
    pub absolute_tolerance: Scalar,
}

impl Default for ConvergenceCriteria {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            relative_tolerance: 1e-6,
            absolute_tolerance: 1e-10,
        }
    }
}

impl ConvergenceCriteria {
    /// Checks if the residual satisfies convergence criteria.
    fn is_converged(&self, residual_norm: Scalar, rhs_norm: Scalar) -> bool {
        residual_norm < self.absolute_tolerance
            || residual_norm < self.relative_tolerance * rhs_norm
    }
}

/// Jacobi (diagonal) preconditioner: M = diag(A).
#[derive(Debug, Clone, PartialEq)]
pub struct Jacobi {
    inverse_diagonal: DVector<CScalar>,
}

impl Jacobi {
    /// Extracts and inverts the diagonal of `matrix`.
    pub fn new(matrix: &CscMatrix<CScalar>) -> Result<Self, SolverError> {
        let n = matrix.nrows();
        let mut diagonal = DVector::zeros(n);
        for (row, col, &val) in matrix.triplet_iter() {
            if row == col {
                diagonal[row] += val;
            }
        }
        if let Some(row) = diagonal.iter().position(|d: &CScalar| d.norm() < BREAKDOWN) {
            debug!(row, "zero diagonal entry");
            return Err(SolverError::SingularMatrix);
        }
        Ok(Self {
            inverse_diagonal: diagonal.map(|d| CScalar::new(1.0, 0.0) / d),
        })
    }

    /// Applies M⁻¹.
    #[must_use]
    pub fn apply(&self, r: &DVector<CScalar>) -> DVector<CScalar> {
        r.component_mul(&self.inverse_diagonal)
    }
}

/// Applies the optional preconditioner.
fn precondition(jacobi: Option<&Jacobi>, r: &DVector<CScalar>) -> DVector<CScalar> {
    jacobi.map_or_else(|| r.clone(), |m| m.apply(r))
}

/// State shared by both Krylov solvers.
#[derive(Default)]
struct Prepared {
    /// Cached system matrix.
    matrix: Option<CscMatrix<CScalar>>,
    /// Preconditioner built in the numeric phase.
    jacobi: Option<Jacobi>,
    /// Matrix dimension.
    dimension: Option<usize>,
    /// Number of nonzeros.
    nnz: Option<usize>,
    /// Iteration count from last solve (interior mutability for SparseSolver trait).
    last_iterations: Cell<Option<usize>>,
    /// Final residual norm from last solve (interior mutability for SparseSolver trait).
    last_residual: Cell<Option<Scalar>>,
}

impl Prepared {
    fn symbolic(&mut self, matrix: &CscMatrix<CScalar>) -> Result<(), SolverError> {
        if matrix.nrows() != matrix.ncols() {
            return Err(SolverError::InvalidMatrix(format!(
                "Matrix must be square: {}x{}",
                matrix.nrows(),
                matrix.ncols()
            )));
        }
        self.dimension = Some(matrix.nrows());
        self.nnz = Some(matrix.nnz());
        self.matrix = None;
        self.jacobi = None;
        Ok(())
    }

    fn numeric(&mut self, matrix: &CscMatrix<CScalar>, use_jacobi: bool) -> Result<(), SolverError> {
        let dim = self
            .dimension
            .ok_or_else(|| SolverError::Other("Must call symbolic() before numeric()".into()))?;
        if matrix.nrows() != dim {
            return Err(SolverError::InvalidMatrix(
                "Matrix dimensions changed since symbolic phase".into(),
            ));
        }
        self.jacobi = if use_jacobi {
            Some(Jacobi::new(matrix)?)
        } else {
            None
        };
        self.matrix = Some(matrix.clone());
        Ok(())
    }

    fn matrix_for(&self, rhs: &DVector<CScalar>) -> Result<&CscMatrix<CScalar>, SolverError> {
        let matrix = self
            .matrix
            .as_ref()
            .ok_or_else(|| SolverError::Other("Must call numeric() before solve()".into()))?;
        if rhs.len() != matrix.nrows() {
            return Err(SolverError::InvalidMatrix(format!(
                "RHS size {} doesn't match matrix size {}",
                rhs.len(),
                matrix.nrows()
            )));
        }
        Ok(matrix)
    }

    fn record(&self, iterations: usize, residual: Scalar) {
        self.last_iterations.set(Some(iterations));
        self.last_residual.set(Some(residual));
    }

    fn stats(&self, name: String, vectors: usize, solve_time: std::time::Duration) -> SolverStats {
        let iterations = self.last_iterations.get();
        let residual = self.last_residual.get();
        SolverStats {
            success: true,
            nnz_matrix: self.nnz.unwrap_or(0),
            solve_time: Some(solve_time),
            iterations,
            residual_norm: residual,
            memory_bytes: Some(
                vectors * self.dimension.unwrap_or(0) * std::mem::size_of::<CScalar>(),
            ),
            notes: vec![
                format!("{name} converged in {} iterations", iterations.unwrap_or(0)),
                format!("Final residual: {:.2e}", residual.unwrap_or(0.0)),
                format!(
                    "Preconditioner: {}",
                    if self.jacobi.is_some() { "Jacobi" } else { "none" }
                ),
            ],
        }
    }
}

/// Bi-Conjugate Gradient Stabilized (BiCGSTAB) solver for nonsymmetric complex systems.
///
/// # Complexity
///
/// - **Memory**: O(n) for n unknowns (8 working vectors)
/// - **Per iteration**: two sparse matrix-vector products
///
/// # Example
///
/// ```
/// use em_diffusion::solver::{BiCGSTAB, ConvergenceCriteria, SparseSolver};
/// use nalgebra::DVector;
/// use nalgebra_sparse::{coo::CooMatrix, CscMatrix};
/// use num_complex::Complex;
///
/// let mut coo = CooMatrix::new(2, 2);
/// coo.push(0, 0, Complex::new(2.0, 0.0));
/// coo.push(1, 1, Complex::new(0.0, 4.0));
/// let matrix = CscMatrix::from(&coo);
///
/// let mut solver = BiCGSTAB::new(ConvergenceCriteria::default());
/// solver.symbolic(&matrix).unwrap();
/// solver.numeric(&matrix).unwrap();
/// let rhs = DVector::from_vec(vec![Complex::new(2.0, 0.0), Complex::new(4.0, 0.0)]);
/// let x = solver.solve(&rhs).unwrap();
/// assert!((x[1] - Complex::new(0.0, -1.0)).norm() < 1e-5);
/// ```
pub struct BiCGSTAB {
    /// Convergence criteria.
    criteria: ConvergenceCriteria,
    /// Whether to build a Jacobi preconditioner.
    use_jacobi: bool,
    state: Prepared,
}

impl BiCGSTAB {
    /// Creates a new BiCGSTAB solver with specified convergence criteria.
    #[must_use]
    pub fn new(criteria: ConvergenceCriteria) -> Self {
        Self {
            criteria,
            use_jacobi: false,
            state: Prepared::default(),
        }
    }

    /// Creates a BiCGSTAB solver with default convergence criteria.
    #[must_use]
    pub fn default_criteria() -> Self {
        Self::new(ConvergenceCriteria::default())
    }

    /// Enables or disables Jacobi preconditioning.
    #[must_use]
    pub const fn with_jacobi(mut self, enabled: bool) -> Self {
        self.use_jacobi = enabled;
        self
    }

    /// Right-preconditioned BiCGSTAB iteration.
    fn iterate(
        &self,
        matrix: &CscMatrix<CScalar>,
        rhs: &DVector<CScalar>,
    ) -> Result<DVector<CScalar>, SolverError> {
        let n = matrix.nrows();
        let jacobi = self.state.jacobi.as_ref();
        let mut x = DVector::zeros(n);
        let mut r = rhs.clone();

        let rhs_norm = rhs.norm();
        let mut res_norm = rhs_norm;

        if rhs_norm == 0.0 || self.criteria.is_converged(res_norm, rhs_norm) {
            self.state.record(0, res_norm);
            return Ok(x);
        }

        // Shadow residual r̃ = r₀
        let r_tilde = r.clone();

        let one = CScalar::new(1.0, 0.0);
        let mut rho = one;
        let mut alpha = one;
        let mut omega = one;
        let mut p: DVector<CScalar> = DVector::zeros(n);
        let mut v: DVector<CScalar> = DVector::zeros(n);

        for iter in 0..self.criteria.max_iterations {
            // ρᵢ = ⟨r̃, rᵢ₋₁⟩
            let rho_new = complex_dot(&r_tilde, &r);
            if rho_new.norm() < BREAKDOWN {
                return Err(SolverError::NumericalInstability(
                    "BiCGSTAB breakdown: rho too small".into(),
                ));
            }

            // β = (ρᵢ/ρᵢ₋₁)(α/ωᵢ₋₁)
            let beta = (rho_new / rho) * (alpha / omega);
            rho = rho_new;

            // pᵢ = rᵢ₋₁ + β(pᵢ₋₁ − ωᵢ₋₁vᵢ₋₁)
            p.axpy(-omega, &v, one);
            p.axpy(one, &r, beta);

            // vᵢ = A M⁻¹ pᵢ
            let y = precondition(jacobi, &p);
            v = matvec(matrix, &y);

            // α = ρᵢ/⟨r̃, vᵢ⟩
            let rtilde_v = complex_dot(&r_tilde, &v);
            if rtilde_v.norm() < BREAKDOWN {
                return Err(SolverError::NumericalInstability(
                    "BiCGSTAB breakdown: (r̃,v) too small".into(),
                ));
            }
            alpha = rho / rtilde_v;

            // s = rᵢ₋₁ − αvᵢ
            let mut s = r.clone();
            s.axpy(-alpha, &v, one);

            let s_norm = s.norm();
            if self.criteria.is_converged(s_norm, rhs_norm) {
                x.axpy(alpha, &y, one);
                self.state.record(iter + 1, s_norm);
                return Ok(x);
            }

            // t = A M⁻¹ s
            let z = precondition(jacobi, &s);
            let t = matvec(matrix, &z);

            // ωᵢ = ⟨t,s⟩/⟨t,t⟩
            let t_t = complex_dot(&t, &t);
            if t_t.norm() < BREAKDOWN {
                return Err(SolverError::NumericalInstability(
                    "BiCGSTAB breakdown: (t,t) too small".into(),
                ));
            }
            omega = complex_dot(&t, &s) / t_t;

            // xᵢ = xᵢ₋₁ + αM⁻¹pᵢ + ωᵢM⁻¹s
            x.axpy(alpha, &y, one);
            x.axpy(omega, &z, one);

            // rᵢ = s − ωᵢt
            s.axpy(-omega, &t, one);
            r = s;

            res_norm = r.norm();
            if iter % 100 == 0 {
                debug!(iteration = iter, relative_residual = res_norm / rhs_norm, "BiCGSTAB");
            }
            if self.criteria.is_converged(res_norm, rhs_norm) {
                self.state.record(iter + 1, res_norm);
                return Ok(x);
            }

            if omega.norm() < BREAKDOWN {
                return Err(SolverError::NumericalInstability(
                    "BiCGSTAB breakdown: omega too small".into(),
                ));
            }
        }

        self.state.record(self.criteria.max_iterations, res_norm);
        Err(SolverError::ConvergenceFailure {
            iterations: self.criteria.max_iterations,
            residual_norm: res_norm,
        })
    }
}

impl SparseSolver for BiCGSTAB {
    fn symbolic(&mut self, matrix: &CscMatrix<CScalar>) -> Result<(), SolverError> {
        self.state.symbolic(matrix)
    }

    fn numeric(&mut self, matrix: &CscMatrix<CScalar>) -> Result<(), SolverError> {
        self.state.numeric(matrix, self.use_jacobi)
    }

    fn solve(&self, rhs: &DVector<CScalar>) -> Result<DVector<CScalar>, SolverError> {
        let matrix = self.state.matrix_for(rhs)?;
        self.iterate(matrix, rhs)
    }

    fn solve_with_stats(
        &self,
        rhs: &DVector<CScalar>,
    ) -> Result<(DVector<CScalar>, SolverStats), SolverError> {
        let start = std::time::Instant::now();
        let solution = self.solve(rhs)?;
        Ok((solution, self.state.stats("BiCGSTAB".into(), 8, start.elapsed())))
    }

    fn name(&self) -> &str {
        "BiCGSTAB"
    }

    fn is_ready(&self) -> bool {
        self.state.matrix.is_some()
    }
}

/// Generalized Minimal Residual (GMRES) solver with restart for nonsymmetric systems.
///
/// Builds an orthonormal Krylov basis with modified Gram-Schmidt and keeps the
/// Hessenberg matrix upper triangular with Givens rotations, so the residual
/// norm of the least-squares problem is available at every step.
///
/// # Complexity
///
/// - **Memory**: O(m × n) for m restart parameter and n unknowns
/// - **Per iteration**: one matrix-vector product plus O(i × n) orthogonalization
pub struct GMRES {
    /// Convergence criteria.
    criteria: ConvergenceCriteria,
    /// Restart parameter (Krylov subspace dimension).
    restart: usize,
    /// Whether to build a Jacobi preconditioner.
    use_jacobi: bool,
    state: Prepared,
}

impl GMRES {
    /// Creates a new GMRES solver with specified restart parameter and convergence criteria.
    #[must_use]
    pub fn new(restart: usize, criteria: ConvergenceCriteria) -> Self {
        Self {
            criteria,
            restart: restart.max(1),
            use_jacobi: false,
            state: Prepared::default(),
        }
    }

    /// Creates a GMRES solver with default settings (restart=30).
    #[must_use]
    pub fn default_criteria() -> Self {
        Self::new(30, ConvergenceCriteria::default())
    }

    /// Enables or disables Jacobi preconditioning.
    #[must_use]
    pub const fn with_jacobi(mut self, enabled: bool) -> Self {
        self.use_jacobi = enabled;
        self
    }

    /// Applies previous Givens rotations to column `i`.
    fn apply_givens_rotation(h: &mut DVector<CScalar>, cs: &[CScalar], sn: &[CScalar], i: usize) {
        for k in 0..i {
            let temp = cs[k].conj() * h[k] + sn[k].conj() * h[k + 1];
            h[k + 1] = -sn[k] * h[k] + cs[k] * h[k + 1];
            h[k] = temp;
        }
    }

    /// Computes Givens rotation to zero out h[i+1].
    fn compute_givens(h_i: CScalar, h_i1: CScalar) -> (CScalar, CScalar) {
        let norm = (h_i.norm_sqr() + h_i1.norm_sqr()).sqrt();
        if norm < BREAKDOWN {
            (CScalar::new(1.0, 0.0), CScalar::new(0.0, 0.0))
        } else {
            (h_i / norm, h_i1 / norm)
        }
    }

    /// One cycle of GMRES(m); returns the estimated residual norm.
    fn cycle(
        &self,
        matrix: &CscMatrix<CScalar>,
        rhs: &DVector<CScalar>,
        rhs_norm: Scalar,
        x: &mut DVector<CScalar>,
        iterations: &mut usize,
    ) -> Scalar {
        let jacobi = self.state.jacobi.as_ref();
        let m = self.restart.min(matrix.nrows());

        let r = rhs - matvec(matrix, x);
        let beta = r.norm();
        if beta < BREAKDOWN || self.criteria.is_converged(beta, rhs_norm) {
            return beta;
        }

        let mut v_basis: Vec<DVector<CScalar>> = vec![r.map(|ri| ri / beta)];
        let mut h_matrix: Vec<DVector<CScalar>> = Vec::with_capacity(m);
        let mut cs: Vec<CScalar> = Vec::with_capacity(m);
        let mut sn: Vec<CScalar> = Vec::with_capacity(m);

        // RHS of least squares: g = [β, 0, ..., 0]
        let mut g = DVector::zeros(m + 1);
        g[0] = CScalar::new(beta, 0.0);
        let mut residual_norm = beta;

        for i in 0..m {
            if *iterations >= self.criteria.max_iterations {
                break;
            }
            *iterations += 1;

            // w = A M⁻¹ vᵢ
            let mut w = matvec(matrix, &precondition(jacobi, &v_basis[i]));

            // Modified Gram-Schmidt orthogonalization
            let mut h_col = DVector::zeros(i + 2);
            for j in 0..=i {
                h_col[j] = complex_dot(&v_basis[j], &w);
                w.axpy(-h_col[j], &v_basis[j], CScalar::new(1.0, 0.0));
            }
            let w_norm = w.norm();
            h_col[i + 1] = CScalar::new(w_norm, 0.0);

            Self::apply_givens_rotation(&mut h_col, &cs, &sn, i);
            let (c, s) = Self::compute_givens(h_col[i], h_col[i + 1]);
            cs.push(c);
            sn.push(s);

            h_col[i] = c.conj() * h_col[i] + s.conj() * h_col[i + 1];
            h_col[i + 1] = CScalar::new(0.0, 0.0);

            let temp = c.conj() * g[i];
            g[i + 1] = -s * g[i];
            g[i] = temp;

            h_matrix.push(h_col);
            residual_norm = g[i + 1].norm();

            // Lucky breakdown: the Krylov space contains the solution.
            if self.criteria.is_converged(residual_norm, rhs_norm) || w_norm < BREAKDOWN {
                break;
            }
            v_basis.push(w.map(|wi| wi / w_norm));
        }

        // Back-solve upper triangular system Hy = g
        let dim = h_matrix.len();
        let mut y = DVector::zeros(dim);
        for k in (0..dim).rev() {
            let mut sum = g[k];
            for j in (k + 1)..dim {
                sum -= h_matrix[j][k] * y[j];
            }
            y[k] = sum / h_matrix[k][k];
        }

        // x = x₀ + M⁻¹ V y
        let mut update = DVector::zeros(x.len());
        for j in 0..dim {
            update.axpy(y[j], &v_basis[j], CScalar::new(1.0, 0.0));
        }
        *x += precondition(jacobi, &update);

        residual_norm
    }

    fn iterate(
        &self,
        matrix: &CscMatrix<CScalar>,
        rhs: &DVector<CScalar>,
    ) -> Result<DVector<CScalar>, SolverError> {
        let mut x = DVector::zeros(matrix.nrows());
        let rhs_norm = rhs.norm();
        let mut iterations = 0;
        if rhs_norm == 0.0 {
            self.state.record(0, 0.0);
            return Ok(x);
        }

        loop {
            let estimate = self.cycle(matrix, rhs, rhs_norm, &mut x, &mut iterations);
            if estimate < BREAKDOWN || self.criteria.is_converged(estimate, rhs_norm) {
                let residual = (rhs - matvec(matrix, &x)).norm();
                // The recurrence can drift from the true residual.
                if residual < BREAKDOWN
                    || self.criteria.is_converged(residual, rhs_norm)
                    || iterations >= self.criteria.max_iterations
                {
                    self.state.record(iterations, residual);
                    return Ok(x);
                }
            }
            if iterations >= self.criteria.max_iterations {
                break;
            }
            debug!(iterations, relative_residual = estimate / rhs_norm, "GMRES restart");
        }

        let final_residual = (rhs - matvec(matrix, &x)).norm();
        self.state.record(iterations, final_residual);
        Err(SolverError::ConvergenceFailure {
            iterations,
            residual_norm: final_residual,
        })
    }
}

impl SparseSolver for GMRES {
    fn symbolic(&mut self, matrix: &CscMatrix<CScalar>) -> Result<(), SolverError> {
        self.state.symbolic(matrix)
    }

    fn numeric(&mut self, matrix: &CscMatrix<CScalar>) -> Result<(), SolverError> {
        self.state.numeric(matrix, self.use_jacobi)
    }

    fn solve(&self, rhs: &DVector<CScalar>) -> Result<DVector<CScalar>, SolverError> {
        let matrix = self.state.matrix_for(rhs)?;
        self.iterate(matrix, rhs)
    }

    fn solve_with_stats(
        &self,
        rhs: &DVector<CScalar>,
    ) -> Result<(DVector<CScalar>, SolverStats), SolverError> {
        let start = std::time::Instant::now();
        let solution = self.solve(rhs)?;
        Ok((
            solution,
            self.state
                .stats(format!("GMRES({})", self.restart), self.restart + 1, start.elapsed()),
        ))
    }

    fn name(&self) -> &str {
        "GMRES"
    }

    fn is_ready(&self) -> bool {
        self.state.matrix.is_some()
    }
}
