//! Implements the base structures shared by the neighbor search and basis functions

mod config;
mod constants;
mod enums;
mod metrics;
mod neighborhood;
pub use crate::base::config::*;
pub use crate::base::constants::*;
pub use crate::base::enums::*;
pub use crate::base::metrics::*;
pub use crate::base::neighborhood::*;

#[cfg(test)]
mod testing;
#[cfg(test)]
pub(crate) use crate::base::testing::*;
