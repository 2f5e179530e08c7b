use super::Neighborhood;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Returns the four corners of the unit square plus its center
///
/// ```text
/// 2-------3
/// |       |
/// |   4   |
/// |       |
/// 0-------1
/// ```
pub(crate) fn sample_square_with_center() -> Neighborhood {
    let mut neighborhood = Neighborhood::new(2);
    neighborhood.push(0, &[0.0, 0.0]);
    neighborhood.push(1, &[1.0, 0.0]);
    neighborhood.push(2, &[0.0, 1.0]);
    neighborhood.push(3, &[1.0, 1.0]);
    neighborhood.push(4, &[0.5, 0.5]);
    neighborhood
}

/// Returns the nodes of a regular grid with n points per axis and spacing h
pub(crate) fn sample_grid_positions(ndim: usize, n: usize, h: f64) -> Vec<Vec<f64>> {
    let nz = if ndim == 3 { n } else { 1 };
    let ny = if ndim >= 2 { n } else { 1 };
    let mut positions = Vec::new();
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..n {
                let all = [i as f64 * h, j as f64 * h, k as f64 * h];
                positions.push(all[..ndim].to_vec());
            }
        }
    }
    positions
}

/// Returns a neighborhood with all nodes of a regular grid
pub(crate) fn sample_grid_neighborhood(ndim: usize, n: usize, h: f64) -> Neighborhood {
    let positions = sample_grid_positions(ndim, n, h);
    let ids: Vec<_> = (0..positions.len()).collect();
    Neighborhood::from_ids(ndim, &ids, &positions)
}

/// Returns random points inside the box [0, size]^ndim
pub(crate) fn random_positions(ndim: usize, npoint: usize, size: f64, seed: u64) -> Vec<Vec<f64>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..npoint)
        .map(|_| (0..ndim).map(|_| rng.gen_range(0.0..size)).collect())
        .collect()
}
