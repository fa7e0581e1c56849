//! CSV export of comparison grids.

use std::io::{self, Write};

use crate::simulation::FieldComparison;
use crate::survey::ReceiverGrid;

/// Writes one row per receiver, rows of the grid first.
///
/// Columns: `x,y,reference_re,reference_im,numerical_re,numerical_im,
/// error_re_pct,error_im_pct`. Non-finite errors are written as `NaN`/`inf`.
pub fn write_comparison_csv<W: Write>(
    mut w: W,
    grid: &ReceiverGrid,
    comparison: &FieldComparison,
) -> io::Result<()> {
    let (rows, cols) = comparison.reference.shape();
    if (rows, cols) != grid.shape() || comparison.numerical.shape() != grid.shape() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("comparison shape {:?} does not match receiver grid {:?}", (rows, cols), grid.shape()),
        ));
    }
    writeln!(
        w,
        "x,y,reference_re,reference_im,numerical_re,numerical_im,error_re_pct,error_im_pct"
    )?;
    for row in 0..rows {
        for col in 0..cols {
            let reference = comparison.reference.get(row, col);
            let numerical = comparison.numerical.get(row, col);
            writeln!(
                w,
                "{},{},{:e},{:e},{:e},{:e},{},{}",
                grid.x[col],
                grid.y[row],
                reference.re,
                reference.im,
                numerical.re,
                numerical.im,
                comparison.error.real[(row, col)],
                comparison.error.imag[(row, col)],
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparison::relative_error;
    use crate::fields::{FieldKind, ReceiverData};
    use crate::math::CScalar;

    #[test]
    fn rows_follow_the_receiver_grid() {
        let grid = ReceiverGrid::new(vec![-10.0, 10.0], vec![5.0], 0.0, 0.0, 0.0);
        let reference = ReceiverData::from_fn(FieldKind::Electric, 1, 2, |_, c| CScalar::new(2.0, c as f64));
        let numerical = ReceiverData::from_fn(FieldKind::Electric, 1, 2, |_, _| CScalar::new(1.0, 1.0));
        let error = relative_error(&reference, &numerical).unwrap();
        let comparison = FieldComparison {
            kind: FieldKind::Electric,
            reference,
            numerical,
            error,
        };
        let mut out = Vec::new();
        write_comparison_csv(&mut out, &grid, &comparison).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("x,y,reference_re"));
        assert_eq!(lines[1], "-10,5,2e0,0e0,1e0,1e0,50,inf");
        assert_eq!(lines[2], "10,5,2e0,1e0,1e0,1e0,50,0");
    }

    #[test]
    fn grid_shape_must_match() {
        let grid = ReceiverGrid::new(vec![0.0], vec![0.0], 0.0, 0.0, 0.0);
        let data = ReceiverData::from_fn(FieldKind::Magnetic, 1, 2, |_, _| CScalar::new(1.0, 0.0));
        let comparison = FieldComparison {
            kind: FieldKind::Magnetic,
            reference: data.clone(),
            numerical: data.clone(),
            error: relative_error(&data, &data).unwrap(),
        };
        assert!(write_comparison_csv(Vec::new(), &grid, &comparison).is_err());
    }
}
