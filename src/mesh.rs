//! Rectilinear (tensor) meshes for the staggered-grid solver.
//!
//! Electric fields live on cell edges, magnetic fields on cell faces. Every
//! vector component is stored on its own tensor grid: for edges along axis `a`
//! the coordinates are cell centres along `a` and nodes along the other two
//! axes, for faces normal to `a` it is the opposite. Flat indices are
//! `i + ni * (j + nj * k)`.

use thiserror::Error;
use tracing::{debug, info};

use crate::constants::{diffusive_wavelength, skin_depth};
use crate::math::{Scalar, R3};

/// Errors raised while building meshes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MeshError {
    /// Fewer than two nodes along an axis.
    #[error("axis {axis} has {count} nodes (need at least 2)")]
    TooFewNodes {
        /// Axis index (0 = x, 1 = y, 2 = z).
        axis: usize,
        /// Number of nodes provided.
        count: usize,
    },
    /// Nodes are not strictly increasing or not finite.
    #[error("axis {axis}: nodes must be finite and strictly increasing (index {index})")]
    NonMonotonic {
        /// Axis index.
        axis: usize,
        /// First offending node index.
        index: usize,
    },
    /// Mesh construction parameters are inconsistent.
    #[error("invalid mesh options: {0}")]
    InvalidOptions(String),
}

/// Where a vector component lives on the staggered grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// Cell edges (electric field).
    Edges,
    /// Cell faces (magnetic field).
    Faces,
}

/// Stretched rectilinear mesh defined by its node coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorMesh {
    nodes: [Vec<Scalar>; 3],
    widths: [Vec<Scalar>; 3],
}

impl TensorMesh {
    /// Builds a mesh from node coordinates along x, y and z.
    pub fn new(
        nodes_x: Vec<Scalar>,
        nodes_y: Vec<Scalar>,
        nodes_z: Vec<Scalar>,
    ) -> Result<Self, MeshError> {
        let nodes = [nodes_x, nodes_y, nodes_z];
        for (axis, n) in nodes.iter().enumerate() {
            if n.len() < 2 {
                return Err(MeshError::TooFewNodes {
                    axis,
                    count: n.len(),
                });
            }
            if let Some(index) = n
                .windows(2)
                .position(|w| !(w[0].is_finite() && w[1].is_finite() && w[1] > w[0]))
            {
                return Err(MeshError::NonMonotonic {
                    axis,
                    index: index + 1,
                });
            }
        }
        let widths: [Vec<Scalar>; 3] =
            [0, 1, 2].map(|a| nodes[a].windows(2).map(|w| w[1] - w[0]).collect());
        Ok(Self { nodes, widths })
    }

    /// Uniform mesh with `cells` cells of width `width` starting at `origin`.
    pub fn uniform(origin: R3, width: Scalar, cells: [usize; 3]) -> Result<Self, MeshError> {
        let axis = |a: usize| -> Vec<Scalar> {
            (0..=cells[a])
                .map(|i| origin[a] + width * i as Scalar)
                .collect()
        };
        Self::new(axis(0), axis(1), axis(2))
    }

    /// Node coordinates along `axis`.
    #[must_use]
    pub fn nodes(&self, axis: usize) -> &[Scalar] {
        &self.nodes[axis]
    }

    /// Cell widths along `axis`.
    #[must_use]
    pub fn widths(&self, axis: usize) -> &[Scalar] {
        &self.widths[axis]
    }

    /// Cell centres along `axis`.
    #[must_use]
    pub fn centers(&self, axis: usize) -> Vec<Scalar> {
        self.nodes[axis]
            .windows(2)
            .map(|w| 0.5 * (w[0] + w[1]))
            .collect()
    }

    /// Widths of the dual cells around each node (halved at the boundary).
    #[must_use]
    pub fn dual_widths(&self, axis: usize) -> Vec<Scalar> {
        let h = &self.widths[axis];
        let n = h.len();
        (0..=n)
            .map(|i| {
                let left = if i > 0 { h[i - 1] } else { 0.0 };
                let right = if i < n { h[i] } else { 0.0 };
                0.5 * (left + right)
            })
            .collect()
    }

    /// Number of cells along each axis.
    #[must_use]
    pub fn shape_cells(&self) -> [usize; 3] {
        [0, 1, 2].map(|a| self.widths[a].len())
    }

    /// Total number of cells.
    #[must_use]
    pub fn n_cells(&self) -> usize {
        self.shape_cells().iter().product()
    }

    /// Centre of cell (i, j, k).
    #[must_use]
    pub fn cell_center(&self, i: usize, j: usize, k: usize) -> R3 {
        let c = |a: usize, idx: usize| 0.5 * (self.nodes[a][idx] + self.nodes[a][idx + 1]);
        R3::new(c(0, i), c(1, j), c(2, k))
    }

    /// Volume of cell (i, j, k).
    #[must_use]
    pub fn cell_volume(&self, i: usize, j: usize, k: usize) -> Scalar {
        self.widths[0][i] * self.widths[1][j] * self.widths[2][k]
    }

    /// Smallest cell width over all axes.
    #[must_use]
    pub fn min_width(&self) -> Scalar {
        self.widths
            .iter()
            .flat_map(|w| w.iter().copied())
            .fold(Scalar::INFINITY, Scalar::min)
    }

    /// Lower and upper bound along `axis`.
    #[must_use]
    pub fn bounds(&self, axis: usize) -> (Scalar, Scalar) {
        let n = &self.nodes[axis];
        (n[0], n[n.len() - 1])
    }

    /// True if `point` lies inside the mesh (bounds inclusive).
    #[must_use]
    pub fn contains(&self, point: &R3) -> bool {
        (0..3).all(|a| {
            let (lo, hi) = self.bounds(a);
            point[a] >= lo && point[a] <= hi
        })
    }

    /// Grid shape of the component along `axis` at `location`.
    #[must_use]
    pub fn component_shape(&self, location: Location, axis: usize) -> [usize; 3] {
        let cells = self.shape_cells();
        let staggered = location == Location::Edges;
        [0, 1, 2].map(|a| {
            if (a == axis) == staggered {
                cells[a]
            } else {
                cells[a] + 1
            }
        })
    }

    /// Number of values of the component along `axis` at `location`.
    #[must_use]
    pub fn component_len(&self, location: Location, axis: usize) -> usize {
        self.component_shape(location, axis).iter().product()
    }

    /// Coordinates of the component along `axis` at `location`.
    #[must_use]
    pub fn component_coords(&self, location: Location, axis: usize) -> [Vec<Scalar>; 3] {
        let staggered = location == Location::Edges;
        [0, 1, 2].map(|a| {
            if (a == axis) == staggered {
                self.centers(a)
            } else {
                self.nodes[a].clone()
            }
        })
    }

    /// Total number of edges (all three components).
    #[must_use]
    pub fn n_edges(&self) -> usize {
        (0..3).map(|a| self.component_len(Location::Edges, a)).sum()
    }

    /// Total number of faces (all three components).
    #[must_use]
    pub fn n_faces(&self) -> usize {
        (0..3).map(|a| self.component_len(Location::Faces, a)).sum()
    }

    /// Offsets of the x, y and z blocks in a stacked edge vector.
    #[must_use]
    pub fn edge_offsets(&self) -> [usize; 3] {
        let nx = self.component_len(Location::Edges, 0);
        let ny = self.component_len(Location::Edges, 1);
        [0, nx, nx + ny]
    }
}

/// Flat index inside a component grid of shape `shape`.
#[inline]
#[must_use]
pub const fn flat_index(shape: [usize; 3], i: usize, j: usize, k: usize) -> usize {
    i + shape[0] * (j + shape[1] * k)
}

/// Parameters for [`construct_mesh`].
#[derive(Debug, Clone, PartialEq)]
pub struct MeshOptions {
    /// Frequency in Hz that sets the diffusion length scale.
    pub frequency: Scalar,
    /// Background resistivity (Ω·m) used for the skin depth.
    pub resistivity: Scalar,
    /// Centre of the uniform region, usually the source centre.
    pub center: R3,
    /// Survey domain `[[xmin, xmax], [ymin, ymax], [zmin, zmax]]`.
    pub domain: [[Scalar; 2]; 3],
    /// Lower and upper limit for the minimum cell width.
    pub min_width_limits: Option<[Scalar; 2]>,
    /// Minimum and maximum stretching factor outside the survey domain.
    pub stretching: [Scalar; 2],
    /// Boundary distance as a multiple of the diffusive wavelength.
    pub lambda_factor: Scalar,
    /// Measure the boundary distance from the centre instead of the domain edges.
    pub lambda_from_center: bool,
    /// Maximum number of stretched cells on each side before the factor grows.
    pub max_buffer_cells: usize,
}

impl MeshOptions {
    /// Options with the given frequency, resistivity, centre and domain; other
    /// fields take the values used by the gallery comparisons.
    #[must_use]
    pub fn new(frequency: Scalar, resistivity: Scalar, center: R3, domain: [[Scalar; 2]; 3]) -> Self {
        Self {
            frequency,
            resistivity,
            center,
            domain,
            min_width_limits: None,
            stretching: [1.045, 1.045],
            lambda_factor: 0.8,
            lambda_from_center: true,
            max_buffer_cells: 64,
        }
    }

    fn validate(&self) -> Result<(), MeshError> {
        let positive = |v: Scalar| v.is_finite() && v > 0.0;
        if !positive(self.frequency) {
            return Err(MeshError::InvalidOptions(format!(
                "frequency must be positive, got {}",
                self.frequency
            )));
        }
        if !positive(self.resistivity) {
            return Err(MeshError::InvalidOptions(format!(
                "resistivity must be positive, got {}",
                self.resistivity
            )));
        }
        for (axis, d) in self.domain.iter().enumerate() {
            if !(d[0].is_finite() && d[1].is_finite() && d[1] > d[0]) {
                return Err(MeshError::InvalidOptions(format!(
                    "domain along axis {axis} must be increasing, got {d:?}"
                )));
            }
        }
        if let Some([lo, hi]) = self.min_width_limits {
            if !(positive(lo) && positive(hi) && hi >= lo) {
                return Err(MeshError::InvalidOptions(format!(
                    "min_width_limits must be positive and ordered, got [{lo}, {hi}]"
                )));
            }
        }
        let [s0, s1] = self.stretching;
        if !(s0.is_finite() && s1.is_finite() && s0 >= 1.0 && s1 >= s0) {
            return Err(MeshError::InvalidOptions(format!(
                "stretching must satisfy 1 <= min <= max, got [{s0}, {s1}]"
            )));
        }
        if !(self.lambda_factor.is_finite() && self.lambda_factor >= 0.0) {
            return Err(MeshError::InvalidOptions(format!(
                "lambda_factor must be non-negative, got {}",
                self.lambda_factor
            )));
        }
        if self.max_buffer_cells == 0 {
            return Err(MeshError::InvalidOptions(
                "max_buffer_cells must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Minimum cell width: a third of the skin depth, clamped to the limits.
    #[must_use]
    pub fn min_width(&self) -> Scalar {
        let width = skin_depth(self.frequency, self.resistivity) / 3.0;
        match self.min_width_limits {
            Some([lo, hi]) => width.clamp(lo, hi),
            None => width,
        }
    }
}

/// Builds a mesh whose cell sizes follow the diffusion length of the scenario.
///
/// A node is placed at the centre; the survey domain is filled with uniform
/// cells of [`MeshOptions::min_width`], after which cells grow geometrically
/// until the boundary (a fraction of the diffusive wavelength away) is reached.
pub fn construct_mesh(options: &MeshOptions) -> Result<TensorMesh, MeshError> {
    options.validate()?;

    let min_width = options.min_width();
    let lambda = options.lambda_factor * diffusive_wavelength(options.frequency, options.resistivity);

    let mut axes: Vec<Vec<Scalar>> = Vec::with_capacity(3);
    for axis in 0..3 {
        let center = options.center[axis];
        let [dmin, dmax] = options.domain[axis];
        let (lower, upper) = if options.lambda_from_center {
            ((center - lambda).min(dmin), (center + lambda).max(dmax))
        } else {
            (dmin - lambda, dmax + lambda)
        };

        let up = half_axis(
            dmax.max(center) - center,
            upper - center,
            min_width,
            options,
        );
        let down = half_axis(
            center - dmin.min(center),
            center - lower,
            min_width,
            options,
        );

        let mut nodes: Vec<Scalar> = down.iter().rev().map(|d| center - d).collect();
        nodes.push(center);
        nodes.extend(up.iter().map(|d| center + d));

        debug!(
            axis,
            cells = nodes.len() - 1,
            min_width,
            lower = nodes[0],
            upper = nodes[nodes.len() - 1],
            "constructed mesh axis"
        );
        axes.push(nodes);
    }

    let [x, y, z]: [Vec<Scalar>; 3] = axes
        .try_into()
        .map_err(|_| MeshError::InvalidOptions("expected three axes".into()))?;
    let mesh = TensorMesh::new(x, y, z)?;
    info!(
        cells = ?mesh.shape_cells(),
        total = mesh.n_cells(),
        min_width,
        "mesh constructed"
    );
    Ok(mesh)
}

/// Distances of the nodes on one side of the centre (centre excluded).
fn half_axis(
    survey: Scalar,
    boundary: Scalar,
    min_width: Scalar,
    options: &MeshOptions,
) -> Vec<Scalar> {
    let mut distances = Vec::new();
    let mut position = 0.0;

    let uniform = (survey / min_width).ceil() as usize;
    for _ in 0..uniform {
        position += min_width;
        distances.push(position);
    }

    if position >= boundary {
        return distances;
    }

    let factor = stretching_factor(boundary - position, min_width, options);
    let mut width = min_width;
    while position < boundary {
        width *= factor;
        position += width;
        distances.push(position);
    }
    distances
}

/// Number of geometrically growing cells needed to cover `remaining`.
fn buffer_cells(remaining: Scalar, min_width: Scalar, factor: Scalar) -> usize {
    let mut covered = 0.0;
    let mut width = min_width;
    let mut count = 0;
    while covered < remaining {
        width *= factor;
        covered += width;
        count += 1;
    }
    count
}

/// Smallest factor in `stretching` that covers `remaining` within the cell budget.
fn stretching_factor(remaining: Scalar, min_width: Scalar, options: &MeshOptions) -> Scalar {
    let [s0, s1] = options.stretching;
    let budget = options.max_buffer_cells;
    if buffer_cells(remaining, min_width, s0) <= budget {
        return s0;
    }
    if buffer_cells(remaining, min_width, s1) > budget {
        return s1;
    }
    let (mut lo, mut hi) = (s0, s1);
    for _ in 0..60 {
        let mid = 0.5 * (lo + hi);
        if buffer_cells(remaining, min_width, mid) <= budget {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    hi
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn gallery_options() -> MeshOptions {
        let mut options = MeshOptions::new(
            0.77,
            1.0,
            R3::new(0.0, 0.0, -300.0),
            [[-500.0, 500.0], [-500.0, 500.0], [-600.0, 0.0]],
        );
        options.min_width_limits = Some([100.0, 100.0]);
        options.stretching = [1.2, 1.5];
        options.max_buffer_cells = 12;
        options
    }

    #[test]
    fn rejects_non_monotonic_nodes() {
        let err = TensorMesh::new(vec![0.0, 1.0], vec![0.0, 0.0], vec![0.0, 1.0]).unwrap_err();
        assert_eq!(err, MeshError::NonMonotonic { axis: 1, index: 1 });
        let err = TensorMesh::new(vec![0.0], vec![0.0, 1.0], vec![0.0, 1.0]).unwrap_err();
        assert_eq!(err, MeshError::TooFewNodes { axis: 0, count: 1 });
    }

    #[test]
    fn component_shapes_follow_staggering() {
        let mesh = TensorMesh::uniform(R3::zeros(), 1.0, [2, 3, 4]).unwrap();
        assert_eq!(mesh.component_shape(Location::Edges, 0), [2, 4, 5]);
        assert_eq!(mesh.component_shape(Location::Edges, 2), [3, 4, 4]);
        assert_eq!(mesh.component_shape(Location::Faces, 0), [3, 3, 4]);
        assert_eq!(mesh.n_edges(), 2 * 4 * 5 + 3 * 3 * 5 + 3 * 4 * 4);
        assert_eq!(mesh.edge_offsets(), [0, 40, 85]);
    }

    #[test]
    fn dual_widths_sum_to_extent() {
        let mesh = TensorMesh::new(
            vec![0.0, 1.0, 3.0, 7.0],
            vec![0.0, 1.0],
            vec![0.0, 1.0],
        )
        .unwrap();
        let dual = mesh.dual_widths(0);
        assert_eq!(dual, vec![0.5, 1.5, 3.0, 2.0]);
        assert_relative_eq!(dual.iter().sum::<f64>(), 7.0);
    }

    #[test]
    fn constructed_mesh_has_node_at_center_and_covers_domain() {
        let options = gallery_options();
        let mesh = construct_mesh(&options).unwrap();
        for axis in 0..3 {
            let nodes = mesh.nodes(axis);
            assert!(nodes
                .iter()
                .any(|n| (n - options.center[axis]).abs() < 1.0e-9));
            let (lo, hi) = mesh.bounds(axis);
            assert!(lo <= options.domain[axis][0]);
            assert!(hi >= options.domain[axis][1]);
        }
        assert_relative_eq!(mesh.min_width(), 100.0, epsilon = 1.0e-9);
    }

    #[test]
    fn boundary_is_a_fraction_of_the_wavelength_away() {
        let options = gallery_options();
        let mesh = construct_mesh(&options).unwrap();
        let lambda = 0.8 * diffusive_wavelength(0.77, 1.0);
        let (lo, hi) = mesh.bounds(0);
        assert!(hi >= lambda);
        assert!(lo <= -lambda);
    }

    #[test]
    fn stretched_cells_grow_monotonically() {
        let mesh = construct_mesh(&gallery_options()).unwrap();
        let w = mesh.widths(0);
        let mid = w.len() / 2;
        for pair in w[mid..].windows(2) {
            assert!(pair[1] >= pair[0] - 1.0e-9);
        }
    }

    #[test]
    fn finer_limits_produce_more_cells() {
        let coarse = construct_mesh(&gallery_options()).unwrap();
        let mut fine_options = gallery_options();
        fine_options.min_width_limits = Some([50.0, 50.0]);
        let fine = construct_mesh(&fine_options).unwrap();
        assert!(fine.n_cells() > coarse.n_cells());
    }

    #[test]
    fn invalid_options_are_rejected() {
        let mut options = gallery_options();
        options.stretching = [0.9, 1.1];
        assert!(matches!(
            construct_mesh(&options),
            Err(MeshError::InvalidOptions(_))
        ));
        let mut options = gallery_options();
        options.frequency = 0.0;
        assert!(construct_mesh(&options).is_err());
    }
}
