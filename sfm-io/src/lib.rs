//! # SfM IO
//!
//! Everything the global mapper reads from or writes to disk:
//!
//! * [`aux_state`] - the binary artifact holding the view graph and the
//!   per-frame cluster and gravity metadata that a sparse snapshot cannot express.
//! * [`snapshot`] - the three-file sparse reconstruction layout (`cameras`,
//!   `images`, `points3D`) in text and binary encodings.
//! * [`convert`] - conversion between a [`Scene`](sfm_core::Scene) and a snapshot.
//! * [`color`] - per-point colors sampled from the source images.
//! * [`image_list`] - the newline separated image name allow-list.
//! * [`export`] - splits a scene into its clusters and writes one snapshot each.

mod binary;
mod error;

pub mod aux_state;
pub mod color;
pub mod convert;
pub mod export;
pub mod image_list;
pub mod snapshot;

pub use aux_state::{
    read_aux_state, write_aux_state, write_aux_state_with, AuxFormat, AuxStateSummary,
    AUX_STATE_FILE,
};
pub use color::extract_colors;
pub use convert::{apply_snapshot, scene_to_snapshot, snapshot_to_scene};
pub use error::*;
pub use export::{
    export_reconstruction, export_reconstruction_with_list, load_allow_list, ExportOptions,
    ExportedComponent,
};
pub use image_list::read_image_list;
pub use snapshot::{Snapshot, SnapshotFormat, SnapshotImage};
