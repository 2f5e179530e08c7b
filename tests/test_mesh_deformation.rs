use gemlab::mesh::{Block, Mesh};
use gemlab::shapes::GeoKind;
use mfsim::prelude::*;
use mfsim::StrError;
use russell_lab::approx_eq;

// 4×4 unit squares over [0,4]×[0,4]
fn block_mesh() -> Result<Mesh, StrError> {
    let mut block = Block::new(&[[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0]])?;
    block.set_ndiv(&[4, 4])?;
    block.subdivide(GeoKind::Qua4)
}

fn shear(nodes: &[Vec<f64>], gamma: f64) -> Vec<Vec<f64>> {
    nodes.iter().map(|x| vec![x[0] + gamma * x[1], x[1]]).collect()
}

#[test]
fn test_mesh_deformation_simple_shear() -> Result<(), StrError> {
    let mesh = block_mesh()?;
    let config = Config::new(2);
    let mut points = MaterialPoints::from_mesh(&config, &mesh)?;
    assert_eq!(points.points().len(), 16);
    assert_eq!(points.nodes().len(), 25);
    approx_eq(points.total_volume(), 16.0, 1e-14);
    let y0: Vec<_> = points.points().iter().map(|p| p.position()[1]).collect();
    let x0: Vec<_> = points.points().iter().map(|p| p.position()[0]).collect();

    // two shear increments
    for step in 1..3 {
        points.advance_all_parallel()?;
        let moved = shear(points.nodes(), 0.1);
        points.move_nodes(moved)?;
        let g = 0.1 * (step as f64);
        for (p, point) in points.points().iter().enumerate() {
            assert_eq!(point.lifecycle(), Lifecycle::Stale);
            approx_eq(point.position()[0], x0[p] + g * y0[p], 1e-8);
            approx_eq(point.position()[1], y0[p], 1e-8);
            let ff = point.deformation_gradient();
            approx_eq(ff.get(0, 0), 1.0, 1e-8);
            approx_eq(ff.get(0, 1), g, 1e-8);
            approx_eq(ff.get(1, 0), 0.0, 1e-8);
            approx_eq(ff.get(1, 1), 1.0, 1e-8);
            approx_eq(ff.get(2, 2), 1.0, 1e-15);
            assert_eq!(point.jacobians().len(), step);
            approx_eq(point.jacobian(), 1.0, 1e-8);
            approx_eq(point.volume(), point.volume0(), 1e-8);
        }
    }
    points.advance_all()?;
    assert!(points.points().iter().all(|p| p.lifecycle() == Lifecycle::Valid));
    assert_eq!(points.metrics().n_basis, 48);

    // write and read the state
    let path = format!("{}/test_mesh_deformation_simple_shear.json", DEFAULT_TEST_DIR);
    points.write_json(&path)?;
    let read = MaterialPoints::read_json(&path)?;
    assert!(read.has_index());
    for (a, b) in points.nodes().iter().zip(read.nodes()) {
        approx_eq(a[0], b[0], 1e-15);
        approx_eq(a[1], b[1], 1e-15);
    }
    for p in 0..16 {
        let a = &points.points()[p];
        let b = &read.points()[p];
        assert_eq!(a.lifecycle(), b.lifecycle());
        assert_eq!(a.neighborhood().ids, b.neighborhood().ids);
        assert_eq!(a.jacobians().len(), b.jacobians().len());
        approx_eq(b.volume(), a.volume(), 1e-14);
        approx_eq(b.deformation_gradient().get(0, 1), 0.2, 1e-8);
    }
    Ok(())
}

#[test]
fn test_mesh_deformation_tension_and_erosion() -> Result<(), StrError> {
    let mesh = block_mesh()?;
    let mut config = Config::new(2);
    config.set_tension(0.05, 3)?;
    let mut points = MaterialPoints::from_mesh(&config, &mesh)?;
    points.advance_all()?;

    // stretch along x
    let moved: Vec<_> = points.nodes().iter().map(|x| vec![1.5 * x[0], x[1]]).collect();
    points.move_nodes(moved)?;
    let mut n_tension = 0;
    for point in points.points() {
        approx_eq(point.volume(), 1.5, 1e-8);
        assert!(point.tension().len() + 3 <= point.neighborhood().len());
        for id in point.tension() {
            assert!(point.neighborhood().contains(*id));
        }
        n_tension += point.tension().len();
    }
    assert!(n_tension > 0);

    // erode a node and a point
    points.erode_node(12)?;
    points.point_mut(0).ok_or("point should exist")?.erode();
    points.advance_all()?;
    for point in points.points() {
        assert!(!point.neighborhood().contains(12));
    }
    assert!(points.points()[0].is_eroded());
    assert!(points.points()[0].basis().is_none());
    approx_eq(points.total_volume(), 15.0 * 1.5, 1e-7);
    Ok(())
}
