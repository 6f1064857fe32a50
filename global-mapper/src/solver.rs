use crate::GlobalPositionerConstraint;
use sfm_core::{Scene, ViewGraph};
use thiserror::Error;

/// Everything the pipeline stages read and mutate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapperState {
    pub view_graph: ViewGraph,
    pub scene: Scene,
}

impl MapperState {
    pub fn new(view_graph: ViewGraph, scene: Scene) -> Self {
        Self { view_graph, scene }
    }
}

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("not enough constraints: {0}")]
    InsufficientConstraints(String),
    #[error("optimization did not converge: {0}")]
    NotConverged(String),
    #[error("{0}")]
    Other(String),
}

/// The numerical work behind each pipeline stage.
///
/// Every method either completes, leaving its results in `state`, or fails
/// and aborts the run. Implementations do not retry.
pub trait GlobalSolver {
    /// Normalizes the input, e.g. by dropping pairs without enough matches.
    fn preprocess(&mut self, state: &mut MapperState) -> Result<(), SolverError>;

    /// Refines the camera intrinsics from the pairwise geometry.
    fn calibrate_view_graph(&mut self, state: &mut MapperState) -> Result<(), SolverError>;

    /// Estimates `cam2_from_cam1` for every valid image pair.
    fn estimate_relative_poses(&mut self, state: &mut MapperState) -> Result<(), SolverError>;

    /// Estimates the rotation of every frame.
    fn average_rotations(&mut self, state: &mut MapperState) -> Result<(), SolverError>;

    /// Chains the inlier matches into tracks.
    fn establish_tracks(&mut self, state: &mut MapperState) -> Result<(), SolverError>;

    /// Estimates frame positions and track points jointly.
    fn position_globally(
        &mut self,
        state: &mut MapperState,
        constraint: GlobalPositionerConstraint,
    ) -> Result<(), SolverError>;

    fn bundle_adjust(&mut self, state: &mut MapperState) -> Result<(), SolverError>;

    fn retriangulate(&mut self, state: &mut MapperState) -> Result<(), SolverError>;

    /// Removes weakly connected frames and assigns a cluster id to the rest.
    fn prune(&mut self, state: &mut MapperState) -> Result<(), SolverError>;
}

impl<S: GlobalSolver + ?Sized> GlobalSolver for &mut S {
    fn preprocess(&mut self, state: &mut MapperState) -> Result<(), SolverError> {
        (**self).preprocess(state)
    }

    fn calibrate_view_graph(&mut self, state: &mut MapperState) -> Result<(), SolverError> {
        (**self).calibrate_view_graph(state)
    }

    fn estimate_relative_poses(&mut self, state: &mut MapperState) -> Result<(), SolverError> {
        (**self).estimate_relative_poses(state)
    }

    fn average_rotations(&mut self, state: &mut MapperState) -> Result<(), SolverError> {
        (**self).average_rotations(state)
    }

    fn establish_tracks(&mut self, state: &mut MapperState) -> Result<(), SolverError> {
        (**self).establish_tracks(state)
    }

    fn position_globally(
        &mut self,
        state: &mut MapperState,
        constraint: GlobalPositionerConstraint,
    ) -> Result<(), SolverError> {
        (**self).position_globally(state, constraint)
    }

    fn bundle_adjust(&mut self, state: &mut MapperState) -> Result<(), SolverError> {
        (**self).bundle_adjust(state)
    }

    fn retriangulate(&mut self, state: &mut MapperState) -> Result<(), SolverError> {
        (**self).retriangulate(state)
    }

    fn prune(&mut self, state: &mut MapperState) -> Result<(), SolverError> {
        (**self).prune(state)
    }
}
