use crate::basis::FailureReason;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Holds the diagnostics of a material point that could not obtain a valid basis
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Failure {
    /// Material point identifier
    pub point: usize,

    /// Position of the material point
    pub position: Vec<f64>,

    /// Number of nodes in the last neighborhood
    pub nnode: usize,

    /// Support radius used in the last search
    pub radius: f64,

    /// Number of support growths performed
    pub n_retry: usize,

    /// Reason of the failure
    pub reason: FailureReason,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "material point {} at {:?} failed with {} nodes within radius {:?} after {} retries: {}",
            self.point,
            self.position,
            self.nnode,
            self.radius,
            self.n_retry,
            self.reason.message()
        )
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::Failure;
    use crate::basis::FailureReason;

    #[test]
    fn display_works() {
        let failure = Failure {
            point: 3,
            position: vec![0.5, 0.25],
            nnode: 2,
            radius: 1.5,
            n_retry: 10,
            reason: FailureReason::InsufficientNeighborhood,
        };
        assert_eq!(
            format!("{}", failure),
            "material point 3 at [0.5, 0.25] failed with 2 nodes within radius 1.5 after 10 retries: \
             neighborhood is insufficient after the maximum number of retries"
        );
    }
}
