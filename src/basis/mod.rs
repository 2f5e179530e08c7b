//! Implements the local basis solvers (max-entropy and moving least-squares)

mod basis_result;
mod basis_solver;
mod max_ent;
mod mls;
mod nelder_mead;
pub use crate::basis::basis_result::*;
pub use crate::basis::basis_solver::*;
pub use crate::basis::max_ent::*;
pub use crate::basis::mls::*;
pub use crate::basis::nelder_mead::*;
