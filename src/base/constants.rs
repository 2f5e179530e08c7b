/// Defines an auxiliary directory where the test result files are saved
pub const DEFAULT_TEST_DIR: &str = "/tmp/mfsim/test";

/// Defines the smallest allowed tolerance (Config)
pub const CONFIG_MIN_TOL: f64 = 1e-15;

/// Defines the smallest allowed support growth factor (Config)
pub const CONFIG_MIN_GROWTH_FACTOR: f64 = 1.01;

/// Defines the relative inflation of the bounding box of the spatial index
pub const BOUNDING_BOX_INFLATION: f64 = 1e-8;
