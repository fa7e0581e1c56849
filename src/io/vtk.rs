//! VTK legacy ASCII export of the mesh model.
//!
//! The mesh is written as a `RECTILINEAR_GRID` with the horizontal and
//! vertical resistivity as cell data, readable by ParaView.

use std::io::{self, Write};

use crate::materials::CellModel;
use crate::mesh::TensorMesh;

/// Writes the VTK legacy file header.
pub fn write_vtk_header<W: Write>(mut writer: W, title: &str) -> io::Result<()> {
    writeln!(writer, "# vtk DataFile Version 3.0")?;
    writeln!(writer, "{}", title)?;
    writeln!(writer, "ASCII")?;
    Ok(())
}

/// Writes `mesh` and the resistivities of `model` as a rectilinear grid.
pub fn write_rectilinear_grid<W: Write>(
    mut writer: W,
    mesh: &TensorMesh,
    model: &CellModel,
    title: &str,
) -> io::Result<()> {
    if model.shape() != mesh.shape_cells() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "model shape {:?} does not match mesh {:?}",
                model.shape(),
                mesh.shape_cells()
            ),
        ));
    }
    write_vtk_header(&mut writer, title)?;
    writeln!(writer, "DATASET RECTILINEAR_GRID")?;
    let [nx, ny, nz] = [0, 1, 2].map(|a| mesh.nodes(a).len());
    writeln!(writer, "DIMENSIONS {} {} {}", nx, ny, nz)?;
    for (axis, name) in ["X", "Y", "Z"].iter().enumerate() {
        let nodes = mesh.nodes(axis);
        writeln!(writer, "{}_COORDINATES {} double", name, nodes.len())?;
        write_values(&mut writer, nodes)?;
    }
    writeln!(writer, "CELL_DATA {}", mesh.n_cells())?;
    for (name, values) in [
        ("resistivity_h", model.resistivity_h()),
        ("resistivity_v", model.resistivity_v()),
    ] {
        writeln!(writer, "SCALARS {} double 1", name)?;
        writeln!(writer, "LOOKUP_TABLE default")?;
        write_values(&mut writer, values)?;
    }
    Ok(())
}

fn write_values<W: Write>(writer: &mut W, values: &[f64]) -> io::Result<()> {
    for chunk in values.chunks(6) {
        let line: Vec<String> = chunk.iter().map(|v| format!("{v:e}")).collect();
        writeln!(writer, "{}", line.join(" "))?;
    }
    Ok(())
}
