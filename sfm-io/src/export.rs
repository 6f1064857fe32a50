//! Writes a finished scene as one snapshot per cluster.

use crate::color::extract_colors;
use crate::convert::scene_to_snapshot;
use crate::image_list::read_image_list;
use crate::snapshot::SnapshotFormat;
use crate::ExportError;
use log::*;
use rayon::prelude::*;
use sfm_core::{Scene, UNCLUSTERED};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct ExportOptions {
    /// `"bin"` or `"txt"`.
    pub output_format: String,
    /// Root the image names are relative to. Colors are only extracted when set.
    pub image_path: Option<PathBuf>,
    /// Newline separated image names restricting color extraction.
    pub image_list_path: Option<PathBuf>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            output_format: SnapshotFormat::Binary.to_string(),
            image_path: None,
            image_list_path: None,
        }
    }
}

/// One written snapshot directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedComponent {
    pub cluster_id: i32,
    pub path: PathBuf,
    pub num_images: usize,
    pub num_points: usize,
}

/// Loads the allow-list named by `path`.
///
/// A path that does not exist is reported and treated as no allow-list.
pub fn load_allow_list(path: Option<&Path>) -> Result<Option<HashSet<String>>, ExportError> {
    let path = match path {
        Some(path) => path,
        None => return Ok(None),
    };
    if !path.exists() {
        warn!(
            "image list {} does not exist, extracting colors for all images",
            path.display()
        );
        return Ok(None);
    }
    let names = read_image_list(path).map_err(|source| ExportError::ImageList {
        path: path.to_owned(),
        source,
    })?;
    info!(
        "loaded {} image names for color extraction filtering",
        names.len()
    );
    Ok(Some(names))
}

/// Writes `scene` below `root`, loading the allow-list named in `options`.
///
/// See [`export_reconstruction_with_list`].
pub fn export_reconstruction(
    root: impl AsRef<Path>,
    scene: &Scene,
    options: &ExportOptions,
) -> Result<Vec<ExportedComponent>, ExportError> {
    let format = output_format(options)?;
    let allow_list = load_allow_list(options.image_list_path.as_deref())?;
    export_components(root.as_ref(), scene, format, options, allow_list.as_ref())
}

/// Writes `scene` below `root` with an allow-list the caller already loaded.
///
/// `options.image_list_path` is ignored. An unclustered scene is written as a
/// whole to `root/0`. Otherwise every cluster id from `0` up to the largest
/// one gets its own directory `root/<cluster>`, which holds an empty snapshot
/// when no frame carries that id. Components are written in parallel and
/// returned in cluster order.
pub fn export_reconstruction_with_list(
    root: impl AsRef<Path>,
    scene: &Scene,
    options: &ExportOptions,
    allow_list: Option<&HashSet<String>>,
) -> Result<Vec<ExportedComponent>, ExportError> {
    let format = output_format(options)?;
    export_components(root.as_ref(), scene, format, options, allow_list)
}

fn output_format(options: &ExportOptions) -> Result<SnapshotFormat, ExportError> {
    options.output_format.parse().map_err(|_| {
        error!("unsupported output format {:?}", options.output_format);
        ExportError::UnsupportedFormat(options.output_format.clone())
    })
}

fn export_components(
    root: &Path,
    scene: &Scene,
    format: SnapshotFormat,
    options: &ExportOptions,
    allow_list: Option<&HashSet<String>>,
) -> Result<Vec<ExportedComponent>, ExportError> {
    let max_cluster = scene.max_cluster_id();
    let components: Vec<Option<i32>> = if max_cluster == UNCLUSTERED {
        vec![None]
    } else {
        let unclustered = scene
            .frames
            .values()
            .filter(|frame| frame.is_registered() && !frame.is_clustered())
            .count();
        if unclustered > 0 {
            warn!(
                "{} registered frames carry no cluster id and are not exported",
                unclustered
            );
        }
        (0..=max_cluster).map(Some).collect()
    };
    info!("exporting {} reconstructions to {}", components.len(), root.display());

    components
        .into_par_iter()
        .map(|cluster| -> Result<ExportedComponent, ExportError> {
            let cluster_id = cluster.unwrap_or(0);
            let path = root.join(cluster_id.to_string());
            let mut snapshot = scene_to_snapshot(scene, cluster);
            if let Some(image_root) = &options.image_path {
                let num_sampled = extract_colors(&mut snapshot, image_root, allow_list);
                debug!(
                    "component {}: sampled colors from {} of {} images",
                    cluster_id,
                    num_sampled,
                    snapshot.images.len()
                );
            }
            snapshot
                .write(&path, format)
                .map_err(|source| ExportError::Component {
                    component: cluster_id,
                    source,
                })?;
            info!(
                "component {}: {} images, {} points",
                cluster_id,
                snapshot.images.len(),
                snapshot.points3d.len()
            );
            Ok(ExportedComponent {
                cluster_id,
                path,
                num_images: snapshot.images.len(),
                num_points: snapshot.points3d.len(),
            })
        })
        .collect()
}
