use super::{cell_centroid_and_measure, Failure, MaterialPoint};
use crate::base::{Config, Metrics};
use crate::basis::BasisSolver;
use crate::search::CellArray;
use crate::StrError;
use gemlab::mesh::Mesh;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

/// Holds the nodes and material points of a meshfree discretization
///
/// The node positions are owned by this collection and indexed by the spatial index; the
/// material points refer to nodes by their index only.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MaterialPoints {
    /// Configuration
    config: Config,

    /// Current node positions
    ///
    /// (nnode)
    nodes: Vec<Vec<f64>>,

    /// Reference (initial) node positions
    ///
    /// (nnode)
    nodes0: Vec<Vec<f64>>,

    /// Material points
    ///
    /// (npoint)
    points: Vec<MaterialPoint>,

    /// Accumulated computational-cost counters
    metrics: Metrics,

    /// Spatial index over the current node positions (rebuilt after reading)
    #[serde(skip)]
    index: Option<CellArray>,
}

impl MaterialPoints {
    /// Allocates a new instance and builds the spatial index
    ///
    /// # Input
    ///
    /// * `config` -- configuration
    /// * `nodes` -- node positions (nnode)
    /// * `positions` -- positions of the material points (npoint)
    /// * `volumes` -- volumes of the material points (npoint)
    /// * `spacings` -- nodal spacing around each material point (npoint)
    pub fn new(
        config: &Config,
        nodes: Vec<Vec<f64>>,
        positions: &[Vec<f64>],
        volumes: &[f64],
        spacings: &[f64],
    ) -> Result<Self, StrError> {
        if let Some(msg) = config.validate() {
            println!("ERROR: {}", msg);
            return Err("cannot allocate material points because config.validate() failed");
        }
        if volumes.len() != positions.len() || spacings.len() != positions.len() {
            return Err("positions, volumes, and spacings must have the same length");
        }
        let mut points = Vec::with_capacity(positions.len());
        for p in 0..positions.len() {
            points.push(MaterialPoint::new(p, &positions[p], volumes[p], spacings[p], config)?);
        }
        let mut collection = MaterialPoints {
            config: config.clone(),
            nodes0: nodes.clone(),
            nodes,
            points,
            metrics: Metrics::new(),
            index: None,
        };
        collection.rebuild_index()?;
        Ok(collection)
    }

    /// Allocates a new instance from a mesh
    ///
    /// The nodes are the mesh points and each cell generates one material point at its centroid
    /// with the volume of the cell. The nodal spacing is the cell measure raised to 1/ndim.
    pub fn from_mesh(config: &Config, mesh: &Mesh) -> Result<Self, StrError> {
        if mesh.ndim != config.ndim {
            return Err("the mesh ndim is incompatible with the configuration");
        }
        if mesh.cells.is_empty() {
            return Err("there are no cells in the mesh");
        }
        let nodes: Vec<_> = mesh.points.iter().map(|p| p.coords[..mesh.ndim].to_vec()).collect();
        let mut positions = Vec::with_capacity(mesh.cells.len());
        let mut volumes = Vec::with_capacity(mesh.cells.len());
        let mut spacings = Vec::with_capacity(mesh.cells.len());
        for cell in &mesh.cells {
            let (centroid, measure) = cell_centroid_and_measure(mesh, cell)?;
            positions.push(centroid);
            volumes.push(measure);
            spacings.push(f64::powf(measure, 1.0 / (mesh.ndim as f64)));
        }
        MaterialPoints::new(config, nodes, &positions, &volumes, &spacings)
    }

    /// Builds the spatial index over the current node positions
    pub fn rebuild_index(&mut self) -> Result<(), StrError> {
        self.index = Some(CellArray::build(self.config.ndim, &self.nodes)?);
        Ok(())
    }

    /// Computes the neighborhoods and bases of all Fresh and Stale material points (serial)
    ///
    /// All points are processed even if some fail; the diagnostics of the failed points are
    /// available via [MaterialPoints::first_failure] and [MaterialPoint::failure].
    pub fn advance_all(&mut self) -> Result<(), StrError> {
        let index = self.index.as_ref().ok_or("the spatial index must be built first")?;
        let mut solver = BasisSolver::new(&self.config)?;
        let mut n_failed = 0;
        for point in self.points.iter_mut() {
            match point.advance(index, &mut solver, &self.config) {
                Ok(metrics) => self.metrics.add(&metrics),
                Err(_) => {
                    self.metrics.add(point.last_metrics());
                    n_failed += 1;
                }
            }
        }
        if n_failed > 0 {
            return Err("at least one material point failed");
        }
        Ok(())
    }

    /// Computes the neighborhoods and bases of all Fresh and Stale material points (parallel)
    ///
    /// Each worker thread allocates its own basis solver.
    pub fn advance_all_parallel(&mut self) -> Result<(), StrError> {
        let index = self.index.as_ref().ok_or("the spatial index must be built first")?;
        let config = &self.config;
        let results: Vec<Result<Metrics, StrError>> = self
            .points
            .par_iter_mut()
            .map_init(
                || BasisSolver::new(config),
                |solver, point| {
                    let solver = solver.as_mut().map_err(|e| *e)?;
                    point.advance(index, solver, config)
                },
            )
            .collect();
        let mut n_failed = 0;
        for (res, point) in results.iter().zip(&self.points) {
            match res {
                Ok(metrics) => self.metrics.add(metrics),
                Err(_) => {
                    self.metrics.add(point.last_metrics());
                    n_failed += 1;
                }
            }
        }
        if n_failed > 0 {
            return Err("at least one material point failed");
        }
        Ok(())
    }

    /// Moves the nodes and updates the material points
    ///
    /// The material points with a valid basis update their position, deformation gradient,
    /// and volume with the new node positions (see [MaterialPoint::update_kinematics]). Then,
    /// the spatial index is rebuilt, the tension sets are updated, and all points become stale.
    ///
    /// The update is computed on a copy of the material points and committed only if all
    /// points succeed; thus, the collection is unchanged if an error is returned.
    pub fn move_nodes(&mut self, nodes: Vec<Vec<f64>>) -> Result<(), StrError> {
        self.check_nodes(&nodes)?;
        let index = CellArray::build(self.config.ndim, &nodes)?;
        let mut points = self.points.clone();
        for point in points.iter_mut() {
            if point.basis().is_some() {
                point.update_kinematics(&nodes)?;
            }
            point.update_tension(&nodes, &self.nodes0, &self.config)?;
            let position = point.position().to_vec();
            point.reset(&position)?;
        }
        self.nodes = nodes;
        self.points = points;
        self.index = Some(index);
        Ok(())
    }

    /// Replaces the node positions (without kinematics) and marks all points as stale
    pub fn reset(&mut self, nodes: Vec<Vec<f64>>) -> Result<(), StrError> {
        self.check_nodes(&nodes)?;
        let index = CellArray::build(self.config.ndim, &nodes)?;
        self.nodes = nodes;
        self.index = Some(index);
        for point in self.points.iter_mut() {
            let position = point.position().to_vec();
            point.reset(&position)?;
        }
        Ok(())
    }

    /// Excludes a node from the neighborhood of all material points
    pub fn erode_node(&mut self, node: usize) -> Result<(), StrError> {
        if node >= self.nodes.len() {
            return Err("node index is out of bounds");
        }
        for point in self.points.iter_mut() {
            point.add_blacklist(node);
        }
        Ok(())
    }

    /// Finds, for every node, all other nodes within a distance `radius`
    pub fn node_neighbors(&self, radius: f64) -> Result<Vec<Vec<usize>>, StrError> {
        let index = self.index.as_ref().ok_or("the spatial index must be built first")?;
        let (neighbors, _) = index.all_neighbors(radius);
        Ok(neighbors)
    }

    /// Returns the diagnostics of the first failed material point
    pub fn first_failure(&self) -> Option<&Failure> {
        self.points.iter().find_map(|p| p.failure())
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the current node positions
    pub fn nodes(&self) -> &[Vec<f64>] {
        &self.nodes
    }

    /// Returns the reference node positions
    pub fn nodes0(&self) -> &[Vec<f64>] {
        &self.nodes0
    }

    /// Returns all material points
    pub fn points(&self) -> &[MaterialPoint] {
        &self.points
    }

    /// Returns a mutable access to a material point
    pub fn point_mut(&mut self, p: usize) -> Option<&mut MaterialPoint> {
        self.points.get_mut(p)
    }

    /// Returns the accumulated computational-cost counters
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Returns true if the spatial index is built
    pub fn has_index(&self) -> bool {
        self.index.is_some()
    }

    /// Returns the total volume of the non-eroded material points
    pub fn total_volume(&self) -> f64 {
        self.points.iter().filter(|p| !p.is_eroded()).map(|p| p.volume()).sum()
    }

    /// Reads a JSON file with the material points and rebuilds the spatial index
    ///
    /// # Input
    ///
    /// * `full_path` -- may be a String, &str, or Path
    pub fn read_json<P>(full_path: &P) -> Result<Self, StrError>
    where
        P: AsRef<OsStr> + ?Sized,
    {
        let path = Path::new(full_path).to_path_buf();
        let input = File::open(path).map_err(|_| "cannot open file")?;
        let buffered = BufReader::new(input);
        let mut collection: MaterialPoints = serde_json::from_reader(buffered).map_err(|_| "cannot parse JSON file")?;
        collection.rebuild_index()?;
        Ok(collection)
    }

    /// Writes a JSON file with the material points (without the spatial index)
    ///
    /// # Input
    ///
    /// * `full_path` -- may be a String, &str, or Path
    pub fn write_json<P>(&self, full_path: &P) -> Result<(), StrError>
    where
        P: AsRef<OsStr> + ?Sized,
    {
        let path = Path::new(full_path).to_path_buf();
        if let Some(p) = path.parent() {
            fs::create_dir_all(p).map_err(|_| "cannot create directory")?;
        }
        let mut file = File::create(&path).map_err(|_| "cannot create file")?;
        serde_json::to_writer(&mut file, &self).map_err(|_| "cannot write file")?;
        Ok(())
    }

    /// Checks the number and dimension of new node positions
    fn check_nodes(&self, nodes: &[Vec<f64>]) -> Result<(), StrError> {
        if nodes.len() != self.nodes.len() {
            return Err("the number of nodes must not change");
        }
        if nodes.iter().any(|x| x.len() < self.config.ndim) {
            return Err("all nodes must have at least ndim coordinates");
        }
        if nodes.iter().any(|x| x[..self.config.ndim].iter().any(|v| !v.is_finite())) {
            return Err("all node coordinates must be finite");
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
