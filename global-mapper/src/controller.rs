use crate::{
    CheckpointManager, CheckpointSlot, GlobalSolver, MapperError, MapperSettings, MapperState,
    Stage, StageSkips,
};
use log::*;
use std::time::Instant;

/// What a call to [`GlobalMapper::solve`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolveReport {
    pub stages_run: Vec<Stage>,
    pub stages_skipped: Vec<Stage>,
    pub checkpoints_written: Vec<CheckpointSlot>,
}

/// Runs the pipeline stages in order on a [`MapperState`].
pub struct GlobalMapper<S> {
    settings: MapperSettings,
    skips: StageSkips,
    checkpoints: Option<CheckpointManager>,
    solver: S,
}

impl<S> GlobalMapper<S>
where
    S: GlobalSolver,
{
    pub fn new(settings: MapperSettings, skips: StageSkips, solver: S) -> Self {
        Self {
            settings,
            skips,
            checkpoints: None,
            solver,
        }
    }

    /// Writes checkpoints through `manager` when checkpointing is enabled in the settings.
    pub fn with_checkpoints(self, manager: CheckpointManager) -> Self {
        Self {
            checkpoints: Some(manager),
            ..self
        }
    }

    pub fn settings(&self) -> &MapperSettings {
        &self.settings
    }

    pub fn skips(&self) -> StageSkips {
        self.skips
    }

    pub fn into_solver(self) -> S {
        self.solver
    }

    pub fn solve(&mut self, state: &mut MapperState) -> Result<SolveReport, MapperError> {
        let mut report = SolveReport::default();
        for stage in Stage::ALL {
            if self.skips.is_skipped(stage) {
                debug!("skipping {}", stage);
                report.stages_skipped.push(stage);
                continue;
            }

            info!("running {}", stage);
            let start = Instant::now();
            self.run_stage(stage, state)
                .map_err(|source| MapperError::Stage { stage, source })?;
            info!("{} done in {:.3} seconds", stage, start.elapsed().as_secs_f64());
            report.stages_run.push(stage);

            if let Some(slot) = CheckpointSlot::for_stage(stage) {
                if let Some(manager) = self.checkpoints.as_ref().filter(|_| self.settings.checkpointing) {
                    manager.write_checkpoint(slot, state)?;
                    report.checkpoints_written.push(slot);
                }
            }
        }
        Ok(report)
    }

    fn run_stage(
        &mut self,
        stage: Stage,
        state: &mut MapperState,
    ) -> Result<(), crate::SolverError> {
        match stage {
            Stage::Preprocessing => self.solver.preprocess(state),
            Stage::ViewGraphCalibration => self.solver.calibrate_view_graph(state),
            Stage::RelativePoseEstimation => self.solver.estimate_relative_poses(state),
            Stage::RotationAveraging => self.solver.average_rotations(state),
            Stage::TrackEstablishment => self.solver.establish_tracks(state),
            Stage::GlobalPositioning => self
                .solver
                .position_globally(state, self.settings.constraint_type),
            Stage::BundleAdjustment => self.solver.bundle_adjust(state),
            Stage::Retriangulation => self.solver.retriangulate(state),
            Stage::Pruning => self.solver.prune(state),
        }
    }
}
