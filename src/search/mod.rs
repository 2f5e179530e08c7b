//! Implements the spatial index for radius queries over point sets

mod bounding_box;
mod brute_force;
mod cell_array;
pub use crate::search::bounding_box::*;
pub use crate::search::brute_force::*;
pub use crate::search::cell_array::*;
