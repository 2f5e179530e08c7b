//! Implements the material points and the maintenance of their neighborhoods and bases

mod cell_geometry;
mod failure;
mod material_point;
mod material_points;
pub use crate::particles::cell_geometry::*;
pub use crate::particles::failure::*;
pub use crate::particles::material_point::*;
pub use crate::particles::material_points::*;
