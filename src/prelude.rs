//! Makes available common structures needed to compute meshfree bases
//!
//! You may write `use mfsim::prelude::*` in your code and obtain
//! access to commonly used functionality.

pub use crate::base::{Basis, Config, Lifecycle, Metrics, Neighborhood, DEFAULT_TEST_DIR};
pub use crate::basis::{BasisOutcome, BasisResult, BasisSolver, FailureReason, SolveStatus};
pub use crate::particles::{Failure, MaterialPoint, MaterialPoints};
pub use crate::search::CellArray;
