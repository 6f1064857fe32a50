//! Entry points of a complete mapper run.

use crate::{
    CheckpointManager, CheckpointSlot, GlobalMapper, GlobalSolver, MapperError, MapperSettings,
    MapperState, ObservationSource, SolveReport, Stage, StageSkips,
};
use log::*;
use sfm_core::ViewGraph;
use sfm_io::{
    export_reconstruction, export_reconstruction_with_list, load_allow_list, snapshot_to_scene,
    ExportOptions, ExportedComponent, Snapshot, SnapshotFormat,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Options of a run that starts from pairwise observations.
#[derive(Debug, Clone)]
pub struct MapperOptions {
    /// Receives the checkpoints and the exported reconstructions.
    pub output_path: PathBuf,
    pub export: ExportOptions,
    pub settings: MapperSettings,
}

/// Options of a run that refines an existing reconstruction.
#[derive(Debug, Clone)]
pub struct ResumeOptions {
    /// Directory holding the snapshot to start from.
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub export: ExportOptions,
    pub settings: MapperSettings,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    /// The checkpoint the run resumed from, if any.
    pub resumed_from: Option<CheckpointSlot>,
    pub solve: SolveReport,
    pub solve_time: Duration,
    /// Written reconstructions in cluster order.
    pub components: Vec<ExportedComponent>,
}

/// Reconstructs from the observations of `source`, resuming from the most
/// advanced checkpoint below the output path.
pub fn run_mapper<O, S>(
    options: &MapperOptions,
    source: &mut O,
    solver: S,
) -> Result<RunSummary, MapperError>
where
    O: ObservationSource,
    S: GlobalSolver,
{
    check_output_format(&options.export)?;
    prepare_output_path(&options.output_path)?;
    let allow_list = load_allow_list(options.export.image_list_path.as_deref())?;

    let mut state = source
        .load(allow_list.as_ref())
        .map_err(|e| MapperError::Observations(Box::new(e)))?;
    if state.view_graph.is_empty() {
        error!("can't continue without image pairs");
        return Err(MapperError::NoImagePairs);
    }
    info!(
        "loaded {} image pairs over {} images",
        state.view_graph.len(),
        state.scene.images.len()
    );

    let checkpoints = CheckpointManager::new(
        &options.output_path,
        options.settings.checkpoint_format,
        options.settings.aux_format,
    );
    let (resumed_from, skips) = checkpoints.restore(&mut state)?;

    let mut mapper =
        GlobalMapper::new(options.settings.clone(), skips, solver).with_checkpoints(checkpoints);
    let (solve, solve_time) = timed_solve(&mut mapper, &mut state)?;

    let components = export_reconstruction_with_list(
        &options.output_path,
        &state.scene,
        &options.export,
        allow_list.as_ref(),
    )?;
    info!("export to {} done", options.output_path.display());
    Ok(RunSummary {
        resumed_from,
        solve,
        solve_time,
        components,
    })
}

/// Refines the reconstruction stored in `options.input_path`.
///
/// The input is taken as already having tracks, so every stage up to track
/// establishment is skipped. No checkpoints are written.
pub fn run_mapper_resume<S>(options: &ResumeOptions, solver: S) -> Result<RunSummary, MapperError>
where
    S: GlobalSolver,
{
    if !options.input_path.is_dir() {
        error!("input path {} is not a directory", options.input_path.display());
        return Err(MapperError::InvalidInputPath(options.input_path.clone()));
    }
    check_output_format(&options.export)?;
    prepare_output_path(&options.output_path)?;

    let snapshot = Snapshot::read(&options.input_path).map_err(MapperError::Input)?;
    info!(
        "loaded reconstruction with {} images and {} points",
        snapshot.images.len(),
        snapshot.points3d.len()
    );
    let mut state = MapperState::new(ViewGraph::new(), snapshot_to_scene(&snapshot));

    let skips = StageSkips::through(Stage::TrackEstablishment);
    let mut mapper = GlobalMapper::new(options.settings.clone(), skips, solver);
    let (solve, solve_time) = timed_solve(&mut mapper, &mut state)?;

    let components =
        export_reconstruction(&options.output_path, &state.scene, &options.export)?;
    info!("export to {} done", options.output_path.display());
    Ok(RunSummary {
        resumed_from: None,
        solve,
        solve_time,
        components,
    })
}

fn check_output_format(export: &ExportOptions) -> Result<SnapshotFormat, MapperError> {
    export.output_format.parse().map_err(|_| {
        error!("invalid output format {:?}", export.output_format);
        MapperError::UnsupportedFormat(export.output_format.clone())
    })
}

fn prepare_output_path(path: &Path) -> Result<(), MapperError> {
    if path.exists() && !path.is_dir() {
        return Err(MapperError::InvalidOutputPath(path.to_owned()));
    }
    fs::create_dir_all(path).map_err(|e| {
        error!("failed to create output path {}: {}", path.display(), e);
        MapperError::InvalidOutputPath(path.to_owned())
    })
}

fn timed_solve<S: GlobalSolver>(
    mapper: &mut GlobalMapper<S>,
    state: &mut MapperState,
) -> Result<(SolveReport, Duration), MapperError> {
    let start = Instant::now();
    let report = mapper.solve(state)?;
    let elapsed = start.elapsed();
    info!("reconstruction done in {:.3} seconds", elapsed.as_secs_f64());
    Ok((report, elapsed))
}
