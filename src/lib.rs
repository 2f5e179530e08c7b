//! Meshfree shape functions and neighbor search for particle simulations
//!
//! This crate computes local interpolation weights (max-entropy or moving least-squares)
//! for scattered nodes and maintains the neighborhoods of material points as the nodes move.

/// Defines a type alias for the error type as a static string
pub type StrError = &'static str;

pub mod base;
pub mod basis;
pub mod particles;
pub mod prelude;
pub mod search;
