//! Checkpoint directories below the output root, one per checkpointable stage.
//!
//! A checkpoint is a snapshot plus the auxiliary state file. A run that finds
//! a valid checkpoint restores it and skips every stage up to the one that
//! wrote it.

use crate::{CheckpointError, MapperState, Stage, StageSkips};
use log::*;
use serde::{Deserialize, Serialize};
use sfm_core::ViewGraph;
use sfm_io::{
    apply_snapshot, read_aux_state, scene_to_snapshot, write_aux_state_with, AuxFormat,
    Snapshot, SnapshotFormat, AUX_STATE_FILE,
};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Suffix of the directory a checkpoint is staged in before it replaces the slot.
const STAGING_SUFFIX: &str = "partial";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointSlot {
    Rotation,
    Tracks,
    GlobalPositioning,
    BundleAdjustment,
}

impl CheckpointSlot {
    /// Ordered from the earliest stage to the latest.
    pub const ALL: [CheckpointSlot; 4] = [
        CheckpointSlot::Rotation,
        CheckpointSlot::Tracks,
        CheckpointSlot::GlobalPositioning,
        CheckpointSlot::BundleAdjustment,
    ];

    pub fn dir_name(self) -> &'static str {
        match self {
            CheckpointSlot::Rotation => "checkpoint_rotation",
            CheckpointSlot::Tracks => "checkpoint_tracks",
            CheckpointSlot::GlobalPositioning => "checkpoint_gp",
            CheckpointSlot::BundleAdjustment => "checkpoint_ba",
        }
    }

    /// The stage after which this slot is written.
    pub fn stage(self) -> Stage {
        match self {
            CheckpointSlot::Rotation => Stage::RotationAveraging,
            CheckpointSlot::Tracks => Stage::TrackEstablishment,
            CheckpointSlot::GlobalPositioning => Stage::GlobalPositioning,
            CheckpointSlot::BundleAdjustment => Stage::BundleAdjustment,
        }
    }

    pub fn for_stage(stage: Stage) -> Option<Self> {
        Self::ALL.into_iter().find(|slot| slot.stage() == stage)
    }
}

impl fmt::Display for CheckpointSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Checks whether `dir` holds a complete checkpoint.
///
/// Never fails and never touches the file system beyond metadata lookups.
pub fn is_valid_checkpoint(dir: impl AsRef<Path>) -> bool {
    let dir = dir.as_ref();
    dir.is_dir() && Snapshot::files_present(dir) && dir.join(AUX_STATE_FILE).is_file()
}

#[derive(Debug, Clone)]
pub struct CheckpointManager {
    root: PathBuf,
    format: SnapshotFormat,
    aux_format: AuxFormat,
}

impl CheckpointManager {
    pub fn new(root: impl Into<PathBuf>, format: SnapshotFormat, aux_format: AuxFormat) -> Self {
        Self {
            root: root.into(),
            format,
            aux_format,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn slot_path(&self, slot: CheckpointSlot) -> PathBuf {
        self.root.join(slot.dir_name())
    }

    fn staging_path(&self, slot: CheckpointSlot) -> PathBuf {
        self.root
            .join(format!("{}.{}", slot.dir_name(), STAGING_SUFFIX))
    }

    /// The most advanced slot holding a valid checkpoint.
    pub fn latest_valid(&self) -> Option<CheckpointSlot> {
        CheckpointSlot::ALL
            .into_iter()
            .rev()
            .find(|&slot| is_valid_checkpoint(self.slot_path(slot)))
    }

    /// Restores the most advanced valid checkpoint into `state`.
    ///
    /// Returns the slot that was restored and the stages the run can skip.
    /// Without a valid checkpoint `state` is left as is and nothing is skipped.
    pub fn restore(
        &self,
        state: &mut MapperState,
    ) -> Result<(Option<CheckpointSlot>, StageSkips), CheckpointError> {
        match self.latest_valid() {
            Some(slot) => {
                info!("found checkpoint {}", self.slot_path(slot).display());
                info!("resuming after {}", slot.stage());
                self.restore_slot(slot, state)?;
                Ok((Some(slot), StageSkips::through(slot.stage())))
            }
            None => {
                info!("no checkpoint found, starting reconstruction from scratch");
                Ok((None, StageSkips::none()))
            }
        }
    }

    /// Loads one slot into `state`.
    ///
    /// The snapshot is applied onto the scene already in `state`, so its rigs
    /// and frames keep their ids and the frame records of the auxiliary state
    /// find the frames they were written for. The view graph is replaced.
    /// On error `state` is unchanged.
    pub fn restore_slot(
        &self,
        slot: CheckpointSlot,
        state: &mut MapperState,
    ) -> Result<(), CheckpointError> {
        let dir = self.slot_path(slot);
        let snapshot = Snapshot::read(&dir).map_err(|source| CheckpointError::ReadSnapshot {
            path: dir.clone(),
            source,
        })?;
        let mut scene = state.scene.clone();
        apply_snapshot(&snapshot, &mut scene);
        let mut view_graph = ViewGraph::new();
        let aux_path = dir.join(AUX_STATE_FILE);
        let summary = read_aux_state(&aux_path, &mut view_graph, &mut scene.frames).map_err(
            |source| CheckpointError::AuxState {
                path: aux_path.clone(),
                source,
            },
        )?;
        info!(
            "restored {} registered frames, {} images, {} tracks and {} image pairs from {}",
            scene.num_registered_frames(),
            scene.images.len(),
            scene.tracks.len(),
            summary.num_pairs,
            dir.display()
        );
        *state = MapperState::new(view_graph, scene);
        Ok(())
    }

    /// Writes `state` into a slot, replacing what was there.
    ///
    /// The checkpoint is assembled in a staging directory next to the slot
    /// and renamed into place, so an interrupted write never leaves a slot
    /// that looks valid with partial content.
    pub fn write_checkpoint(
        &self,
        slot: CheckpointSlot,
        state: &MapperState,
    ) -> Result<PathBuf, CheckpointError> {
        let staging = self.staging_path(slot);
        let target = self.slot_path(slot);
        if staging.exists() {
            remove_dir(&staging)?;
        }

        let snapshot = scene_to_snapshot(&state.scene, None);
        snapshot
            .write(&staging, self.format)
            .map_err(|source| CheckpointError::WriteSnapshot {
                path: staging.clone(),
                source,
            })?;
        let aux_path = staging.join(AUX_STATE_FILE);
        write_aux_state_with(
            &aux_path,
            &state.view_graph,
            &state.scene.frames,
            self.aux_format,
        )
        .map_err(|source| CheckpointError::AuxState {
            path: aux_path,
            source,
        })?;

        if target.exists() {
            remove_dir(&target)?;
        }
        fs::rename(&staging, &target).map_err(|source| CheckpointError::Io {
            path: target.clone(),
            source,
        })?;
        info!(
            "wrote checkpoint {} ({} images, {} points)",
            target.display(),
            snapshot.images.len(),
            snapshot.points3d.len()
        );
        Ok(target)
    }
}

fn remove_dir(path: &Path) -> Result<(), CheckpointError> {
    fs::remove_dir_all(path).map_err(|source| CheckpointError::Io {
        path: path.to_owned(),
        source,
    })
}
