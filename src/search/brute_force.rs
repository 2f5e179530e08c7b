/// Finds the points within a distance `radius` of `x` by checking all points
///
/// This is the reference O(n) query; see [crate::search::CellArray::query].
pub fn brute_force_query(ndim: usize, points: &[Vec<f64>], x: &[f64], radius: f64) -> Vec<usize> {
    if radius < 0.0 {
        return Vec::new();
    }
    let r2 = radius * radius;
    (0..points.len())
        .filter(|i| {
            let mut d2 = 0.0;
            for k in 0..ndim {
                let d = points[*i][k] - x[k];
                d2 += d * d;
            }
            d2 <= r2
        })
        .collect()
}

/// Finds, for every point, all other points within a distance `radius` by checking all pairs
///
/// This is the reference O(n²) search; see [crate::search::batch_all_neighbors].
pub fn brute_force_all_neighbors(ndim: usize, points: &[Vec<f64>], radius: f64) -> Vec<Vec<usize>> {
    (0..points.len())
        .map(|i| {
            let mut found = brute_force_query(ndim, points, &points[i], radius);
            found.retain(|j| *j != i);
            found
        })
        .collect()
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{brute_force_all_neighbors, brute_force_query};

    #[test]
    fn brute_force_works() {
        let points = vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 2.0]];
        assert_eq!(brute_force_query(2, &points, &[0.0, 0.0], 1.0), &[0, 1]);
        assert_eq!(brute_force_query(2, &points, &[0.0, 0.0], -1.0).len(), 0);
        let neighbors = brute_force_all_neighbors(2, &points, 2.0);
        assert_eq!(neighbors[0], &[1, 2]);
        assert_eq!(neighbors[1], &[0]);
        assert_eq!(neighbors[2], &[0]);
    }
}
