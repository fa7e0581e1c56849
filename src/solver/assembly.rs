//! Assembly of the staggered-grid curl-curl system.
//!
//! Unknowns are the tangential electric fields on all edges, stacked as
//! `[Ex; Ey; Ez]`. The system
//!
//! ```text
//! (Cᵀ D C − iωμ₀ M_σ) e = iωμ₀ s
//! ```
//!
//! collects `(L'_f / A_f) c cᵀ` from every face, where `c` holds the signed
//! lengths of its four edges and `L'_f` is the dual width along the face
//! normal. `M_σ` is diagonal with the edge volume times the volume-averaged
//! conductivity. Tangential edges on the outer boundary are perfect electric
//! conductors: identity rows and no coupling.
//!
//! The matrix is written column by column straight into CSC storage. An
//! interior edge touches four faces, so a column holds at most 13 entries and
//! peak memory stays at the size of the final matrix.

use nalgebra::DVector;
use nalgebra_sparse::CscMatrix;

use super::SolverError;
use crate::constants::{angular_frequency, VACUUM_PERMEABILITY};
use crate::fields::Interpolation;
use crate::materials::CellModel;
use crate::math::{CScalar, Scalar, J};
use crate::mesh::{flat_index, Location, TensorMesh};
use crate::survey::Segment;

/// Upper bound of stored entries per column of the curl-curl system.
pub const MAX_COLUMN_ENTRIES: usize = 13;

/// Column-wise CSC builder.
///
/// Entries go into the open column in any order; duplicates are summed when
/// the column is closed.
pub struct SystemBuilder {
    n: usize,
    col_offsets: Vec<usize>,
    row_indices: Vec<usize>,
    values: Vec<CScalar>,
    column: Vec<(usize, CScalar)>,
}

impl SystemBuilder {
    /// Creates a builder for `n` unknowns with room for `nnz_hint` entries.
    #[must_use]
    pub fn new(n: usize, nnz_hint: usize) -> Self {
        let mut col_offsets = Vec::with_capacity(n + 1);
        col_offsets.push(0);
        Self {
            n,
            col_offsets,
            row_indices: Vec::with_capacity(nnz_hint),
            values: Vec::with_capacity(nnz_hint),
            column: Vec::with_capacity(4 * MAX_COLUMN_ENTRIES),
        }
    }

    /// Adds `val` at `row` of the open column.
    pub fn add(&mut self, row: usize, val: CScalar) {
        self.column.push((row, val));
    }

    /// Sorts and merges the open column and starts the next one.
    pub fn finish_column(&mut self) {
        self.column.sort_unstable_by_key(|&(row, _)| row);
        let start = self.row_indices.len();
        for (row, val) in self.column.drain(..) {
            let repeated = self.row_indices.len() > start && self.row_indices.last() == Some(&row);
            match self.values.last_mut() {
                Some(acc) if repeated => *acc += val,
                _ => {
                    self.row_indices.push(row);
                    self.values.push(val);
                }
            }
        }
        self.col_offsets.push(self.row_indices.len());
    }

    /// Number of stored entries so far.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Finalizes into a CSC matrix; every column must have been closed.
    pub fn finalize(self) -> Result<CscMatrix<CScalar>, SolverError> {
        let columns = self.col_offsets.len() - 1;
        if columns != self.n || !self.column.is_empty() {
            return Err(SolverError::InvalidMatrix(format!(
                "{columns} of {} columns closed",
                self.n
            )));
        }
        CscMatrix::try_from_csc_data(self.n, self.n, self.col_offsets, self.row_indices, self.values)
            .map_err(|e| SolverError::InvalidMatrix(e.to_string()))
    }
}

/// Index helper for the stacked edge vector.
struct EdgeNumbering {
    cells: [usize; 3],
    shapes: [[usize; 3]; 3],
    offsets: [usize; 3],
}

impl EdgeNumbering {
    fn new(mesh: &TensorMesh) -> Self {
        Self {
            cells: mesh.shape_cells(),
            shapes: [0, 1, 2].map(|a| mesh.component_shape(Location::Edges, a)),
            offsets: mesh.edge_offsets(),
        }
    }

    fn id(&self, axis: usize, i: usize, j: usize, k: usize) -> usize {
        self.offsets[axis] + flat_index(self.shapes[axis], i, j, k)
    }

    /// True if the edge is tangential to the outer boundary.
    fn on_boundary(&self, axis: usize, index: [usize; 3]) -> bool {
        (0..3)
            .filter(|&b| b != axis)
            .any(|b| index[b] == 0 || index[b] == self.cells[b])
    }

    /// Visits every edge of component `axis` in stacked order.
    fn for_each(&self, axis: usize, mut f: impl FnMut([usize; 3])) {
        let [ni, nj, nk] = self.shapes[axis];
        for k in 0..nk {
            for j in 0..nj {
                for i in 0..ni {
                    f([i, j, k]);
                }
            }
        }
    }

    /// Faces `(normal, index)` that have the edge `(axis, index)` on their rim.
    fn faces_of(&self, axis: usize, index: [usize; 3]) -> impl Iterator<Item = (usize, [usize; 3])> + '_ {
        (0..3).filter(move |&f| f != axis).flat_map(move |normal| {
            let side = 3 - axis - normal;
            [index[side].checked_sub(1), Some(index[side])]
                .into_iter()
                .flatten()
                .filter(move |&c| c < self.cells[side])
                .map(move |c| {
                    let mut face = index;
                    face[side] = c;
                    (normal, face)
                })
        })
    }
}

/// Discrete curl of one face: its four edges with signed lengths.
struct FaceCurl<'a> {
    numbering: &'a EdgeNumbering,
    widths: [&'a [Scalar]; 3],
    dual: [Vec<Scalar>; 3],
}

impl<'a> FaceCurl<'a> {
    fn new(mesh: &'a TensorMesh, numbering: &'a EdgeNumbering) -> Self {
        Self {
            numbering,
            widths: [mesh.widths(0), mesh.widths(1), mesh.widths(2)],
            dual: [0, 1, 2].map(|a| mesh.dual_widths(a)),
        }
    }

    /// Edges of face `(normal, [i, j, k])` and its weight `L'_f / A_f`.
    fn edges(&self, normal: usize, [i, j, k]: [usize; 3]) -> ([(usize, Scalar); 4], Scalar) {
        let e = |a: usize, i: usize, j: usize, k: usize| self.numbering.id(a, i, j, k);
        let [hx, hy, hz] = self.widths;
        match normal {
            0 => (
                [
                    (e(2, i, j + 1, k), hz[k]),
                    (e(2, i, j, k), -hz[k]),
                    (e(1, i, j, k + 1), -hy[j]),
                    (e(1, i, j, k), hy[j]),
                ],
                self.dual[0][i] / (hy[j] * hz[k]),
            ),
            1 => (
                [
                    (e(0, i, j, k + 1), hx[i]),
                    (e(0, i, j, k), -hx[i]),
                    (e(2, i + 1, j, k), -hz[k]),
                    (e(2, i, j, k), hz[k]),
                ],
                self.dual[1][j] / (hz[k] * hx[i]),
            ),
            _ => (
                [
                    (e(1, i + 1, j, k), hy[j]),
                    (e(1, i, j, k), -hy[j]),
                    (e(0, i, j + 1, k), -hx[i]),
                    (e(0, i, j, k), hx[i]),
                ],
                self.dual[2][k] / (hx[i] * hy[j]),
            ),
        }
    }
}

/// Edge volume times volume-averaged conductivity, stacked `[x; y; z]`.
///
/// x and y edges use the horizontal conductivity, z edges the vertical one.
#[must_use]
pub fn edge_conductance(mesh: &TensorMesh, model: &CellModel) -> Vec<Scalar> {
    let numbering = EdgeNumbering::new(mesh);
    let cells = numbering.cells;
    let mut out = Vec::with_capacity(mesh.n_edges());

    for axis in 0..3 {
        let others: Vec<usize> = (0..3).filter(|&b| b != axis).collect();
        let (b, c) = (others[0], others[1]);
        let (wb, wc) = (mesh.widths(b), mesh.widths(c));
        numbering.for_each(axis, |index| {
            let length = mesh.widths(axis)[index[axis]];
            let mut sum = 0.0;
            for cb in index[b].saturating_sub(1)..index[b].min(cells[b] - 1) + 1 {
                for cc in index[c].saturating_sub(1)..index[c].min(cells[c] - 1) + 1 {
                    let mut cell = index;
                    cell[b] = cb;
                    cell[c] = cc;
                    let sigma = if axis == 2 {
                        model.conductivity_v(cell)
                    } else {
                        model.conductivity_h(cell)
                    };
                    sum += 0.25 * wb[cb] * wc[cc] * sigma;
                }
            }
            out.push(length * sum);
        });
    }
    out
}

/// Assembles `Cᵀ D C − iωμ₀ M_σ` with PEC boundaries.
pub fn assemble_system(
    mesh: &TensorMesh,
    model: &CellModel,
    frequency: Scalar,
) -> Result<CscMatrix<CScalar>, SolverError> {
    if model.shape() != mesh.shape_cells() {
        return Err(SolverError::InvalidMatrix(format!(
            "model shape {:?} does not match mesh {:?}",
            model.shape(),
            mesh.shape_cells()
        )));
    }
    let numbering = EdgeNumbering::new(mesh);
    let n = mesh.n_edges();
    let iwu = J * (angular_frequency(frequency) * VACUUM_PERMEABILITY);

    let mut boundary = vec![false; n];
    for axis in 0..3 {
        numbering.for_each(axis, |index| {
            boundary[numbering.id(axis, index[0], index[1], index[2])] =
                numbering.on_boundary(axis, index);
        });
    }
    let conductance = edge_conductance(mesh, model);
    let curl = FaceCurl::new(mesh, &numbering);

    // Complex symmetric: column `col` equals row `col`.
    let mut builder = SystemBuilder::new(n, MAX_COLUMN_ENTRIES * n);
    for axis in 0..3 {
        numbering.for_each(axis, |index| {
            let col = numbering.id(axis, index[0], index[1], index[2]);
            if boundary[col] {
                builder.add(col, CScalar::new(1.0, 0.0));
                builder.finish_column();
                return;
            }
            for (normal, face) in numbering.faces_of(axis, index) {
                let (edges, weight) = curl.edges(normal, face);
                let own = edges.iter().find(|&&(id, _)| id == col).map_or(0.0, |&(_, c)| c);
                for &(row, cr) in &edges {
                    if !boundary[row] {
                        builder.add(row, CScalar::new(weight * cr * own, 0.0));
                    }
                }
            }
            builder.add(col, -iwu * conductance[col]);
            builder.finish_column();
        });
    }
    builder.finalize()
}

/// Right-hand side `iωμ₀ s` for the wire `segments`.
///
/// Each segment is cut into pieces no longer than a quarter of the smallest
/// cell and every piece moment is spread over the surrounding edges with
/// trilinear weights. Boundary edges receive nothing.
#[must_use]
pub fn source_vector(mesh: &TensorMesh, segments: &[Segment], frequency: Scalar) -> DVector<CScalar> {
    let numbering = EdgeNumbering::new(mesh);
    let iwu = J * (angular_frequency(frequency) * VACUUM_PERMEABILITY);
    let coords = [0, 1, 2].map(|a| mesh.component_coords(Location::Edges, a));
    let max_piece = 0.25 * mesh.min_width();

    let mut rhs = DVector::zeros(mesh.n_edges());
    for segment in segments {
        let length = segment.length();
        if length == 0.0 {
            continue;
        }
        let pieces = (length / max_piece).ceil().max(1.0) as usize;
        let moment = segment.moment() / pieces as Scalar;
        for piece in 0..pieces {
            let t = 2.0 * (piece as Scalar + 0.5) / pieces as Scalar - 1.0;
            let x = segment.point_at(t);
            for axis in 0..3 {
                if moment[axis] == 0.0 {
                    continue;
                }
                let [cx, cy, cz] = &coords[axis];
                let sx = Interpolation::Linear.stencil(cx, x.x);
                let sy = Interpolation::Linear.stencil(cy, x.y);
                let sz = Interpolation::Linear.stencil(cz, x.z);
                for &(k, wz) in &sz {
                    for &(j, wy) in &sy {
                        for &(i, wx) in &sx {
                            if numbering.on_boundary(axis, [i, j, k]) {
                                continue;
                            }
                            rhs[numbering.id(axis, i, j, k)] +=
                                iwu * (moment[axis] * wx * wy * wz);
                        }
                    }
                }
            }
        }
    }
    rhs
}
