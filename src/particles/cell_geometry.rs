use crate::StrError;
use gemlab::mesh::{Cell, Mesh};
use gemlab::shapes::GeoKind;

/// Tetrahedra splitting a Hex8 along the diagonal 0-6
const HEX8_TETS: [[usize; 4]; 6] = [[0, 1, 2, 6], [0, 2, 3, 6], [0, 3, 7, 6], [0, 7, 4, 6], [0, 4, 5, 6], [0, 5, 1, 6]];

/// Computes the centroid and the measure (length, area, or volume) of a cell
///
/// Supports Lin2 (1D), Tri3 and Qua4 (2D), and Tet4 and Hex8 (3D). Qua4 and Hex8 are split
/// into triangles and tetrahedra; thus, the centroid is the measure-weighted average of the
/// centroids of the pieces.
///
/// Lin2 is only reached by direct callers with 1D point sets; [cell_centroid_and_measure]
/// receives gemlab meshes, which are 2D or 3D.
///
/// # Input
///
/// * `kind` -- the kind of cell
/// * `xx` -- the coordinates of the cell points
pub fn centroid_and_measure(kind: GeoKind, xx: &[&[f64]]) -> Result<(Vec<f64>, f64), StrError> {
    let (ndim, npoint) = match kind {
        GeoKind::Lin2 => (1, 2),
        GeoKind::Tri3 => (2, 3),
        GeoKind::Qua4 => (2, 4),
        GeoKind::Tet4 => (3, 4),
        GeoKind::Hex8 => (3, 8),
        _ => return Err("the kind of cell is not supported (Lin2, Tri3, Qua4, Tet4, or Hex8)"),
    };
    if xx.len() != npoint {
        return Err("the number of points is incompatible with the kind of cell");
    }
    if xx.iter().any(|x| x.len() < ndim) {
        return Err("the points must have at least ndim coordinates");
    }
    let mut centroid = vec![0.0; ndim];
    let measure = match kind {
        GeoKind::Lin2 => {
            centroid[0] = (xx[0][0] + xx[1][0]) / 2.0;
            f64::abs(xx[1][0] - xx[0][0])
        }
        GeoKind::Tri3 => accumulate(&mut centroid, &[xx[0], xx[1], xx[2]]),
        GeoKind::Qua4 => {
            accumulate(&mut centroid, &[xx[0], xx[1], xx[2]]) + accumulate(&mut centroid, &[xx[0], xx[2], xx[3]])
        }
        GeoKind::Tet4 => accumulate(&mut centroid, &[xx[0], xx[1], xx[2], xx[3]]),
        _ => HEX8_TETS
            .iter()
            .map(|t| accumulate(&mut centroid, &[xx[t[0]], xx[t[1]], xx[t[2]], xx[t[3]]]))
            .sum::<f64>(),
    };
    if !(measure > 0.0) {
        return Err("the cell measure must be positive");
    }
    if kind != GeoKind::Lin2 {
        for c in centroid.iter_mut() {
            *c /= measure;
        }
    }
    Ok((centroid, measure))
}

/// Computes the centroid and measure of a mesh cell
pub fn cell_centroid_and_measure(mesh: &Mesh, cell: &Cell) -> Result<(Vec<f64>, f64), StrError> {
    let xx: Vec<&[f64]> = cell.points.iter().map(|p| mesh.points[*p].coords.as_slice()).collect();
    centroid_and_measure(cell.kind, &xx)
}

/// Adds measure × centroid of a simplex (triangle or tetrahedron) to `sum` and returns the measure
fn accumulate(sum: &mut [f64], xx: &[&[f64]]) -> f64 {
    let ndim = sum.len();
    let measure = if ndim == 2 {
        let (ax, ay) = (xx[1][0] - xx[0][0], xx[1][1] - xx[0][1]);
        let (bx, by) = (xx[2][0] - xx[0][0], xx[2][1] - xx[0][1]);
        f64::abs(ax * by - ay * bx) / 2.0
    } else {
        let mut a = [[0.0; 3]; 3];
        for r in 0..3 {
            for c in 0..3 {
                a[r][c] = xx[r + 1][c] - xx[0][c];
            }
        }
        let det = a[0][0] * (a[1][1] * a[2][2] - a[1][2] * a[2][1]) - a[0][1] * (a[1][0] * a[2][2] - a[1][2] * a[2][0])
            + a[0][2] * (a[1][0] * a[2][1] - a[1][1] * a[2][0]);
        f64::abs(det) / 6.0
    };
    let n = xx.len() as f64;
    for i in 0..ndim {
        let mean: f64 = xx.iter().map(|x| x[i]).sum::<f64>() / n;
        sum[i] += measure * mean;
    }
    measure
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
