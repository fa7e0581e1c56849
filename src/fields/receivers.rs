use nalgebra::DMatrix;

use crate::fields::FieldKind;
use crate::math::{CScalar, Scalar};

/// Complex field samples on a receiver grid, shape `(ny, nx)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiverData {
    /// Field the samples describe.
    pub kind: FieldKind,
    values: DMatrix<CScalar>,
}

impl ReceiverData {
    /// Wraps a matrix of samples.
    #[must_use]
    pub const fn new(kind: FieldKind, values: DMatrix<CScalar>) -> Self {
        Self { kind, values }
    }

    /// Builds samples from a function of (row, column).
    #[must_use]
    pub fn from_fn(kind: FieldKind, rows: usize, cols: usize, f: impl FnMut(usize, usize) -> CScalar) -> Self {
        Self::new(kind, DMatrix::from_fn(rows, cols, f))
    }

    /// `(rows, columns)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        self.values.shape()
    }

    /// Complex samples.
    #[must_use]
    pub const fn values(&self) -> &DMatrix<CScalar> {
        &self.values
    }

    /// Sample at (`row`, `col`).
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> CScalar {
        self.values[(row, col)]
    }

    /// Real parts.
    #[must_use]
    pub fn real(&self) -> DMatrix<Scalar> {
        self.values.map(|c| c.re)
    }

    /// Imaginary parts.
    #[must_use]
    pub fn imag(&self) -> DMatrix<Scalar> {
        self.values.map(|c| c.im)
    }

    /// Amplitudes `√(re² + im²)`.
    #[must_use]
    pub fn amplitude(&self) -> DMatrix<Scalar> {
        self.values.map(|c| c.re.hypot(c.im))
    }

    /// Copy with real and imaginary channels exchanged.
    #[must_use]
    pub fn swapped_channels(&self) -> Self {
        Self::new(self.kind, self.values.map(|c| CScalar::new(c.im, c.re)))
    }
}
