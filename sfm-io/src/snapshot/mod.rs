//! The sparse reconstruction layout shared with common SfM tools.
//!
//! A snapshot directory holds three files, `cameras`, `images` and `points3D`,
//! each either with a `.bin` (little-endian binary) or `.txt` (line based text)
//! extension. Reading prefers the binary file when both exist.

mod binary;
mod text;

use crate::SnapshotError;
use sfm_core::nalgebra::Isometry3;
use sfm_core::{Camera, CameraId, Feature, ImageId, Track, TrackId};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

pub const CAMERAS_FILE: &str = "cameras";
pub const IMAGES_FILE: &str = "images";
pub const POINTS3D_FILE: &str = "points3D";

/// Encoding of the three snapshot files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum SnapshotFormat {
    #[default]
    #[cfg_attr(feature = "serde-serialize", serde(rename = "bin"))]
    Binary,
    #[cfg_attr(feature = "serde-serialize", serde(rename = "txt"))]
    Text,
}

impl SnapshotFormat {
    pub fn extension(self) -> &'static str {
        match self {
            SnapshotFormat::Binary => "bin",
            SnapshotFormat::Text => "txt",
        }
    }

    fn file(self, dir: &Path, stem: &str) -> PathBuf {
        dir.join(format!("{}.{}", stem, self.extension()))
    }
}

impl fmt::Display for SnapshotFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for SnapshotFormat {
    type Err = SnapshotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bin" => Ok(SnapshotFormat::Binary),
            "txt" => Ok(SnapshotFormat::Text),
            other => Err(SnapshotError::UnsupportedFormat(other.to_owned())),
        }
    }
}

/// A posed image as stored in a snapshot.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct SnapshotImage {
    pub image_id: ImageId,
    pub camera_id: CameraId,
    pub name: String,
    pub cam_from_world: Isometry3<f64>,
    /// Every 2d point of the image, the index in this list being the feature index.
    pub points2d: Vec<Feature>,
}

/// Cameras, posed images and 3d points of one reconstruction.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Snapshot {
    pub cameras: BTreeMap<CameraId, Camera>,
    pub images: BTreeMap<ImageId, SnapshotImage>,
    pub points3d: BTreeMap<TrackId, Track>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty() && self.images.is_empty() && self.points3d.is_empty()
    }

    /// Checks that all three files exist in `dir`, each in either encoding.
    ///
    /// Never fails; an unreadable directory simply has no files.
    pub fn files_present(dir: impl AsRef<Path>) -> bool {
        let dir = dir.as_ref();
        [CAMERAS_FILE, IMAGES_FILE, POINTS3D_FILE]
            .iter()
            .all(|stem| locate(dir, stem).is_some())
    }

    /// Reads a snapshot from `dir`.
    pub fn read(dir: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let dir = dir.as_ref();
        let cameras = match locate_required(dir, CAMERAS_FILE)? {
            (path, SnapshotFormat::Binary) => binary::read_cameras(&path)?,
            (path, SnapshotFormat::Text) => text::read_cameras(&path)?,
        };
        let images = match locate_required(dir, IMAGES_FILE)? {
            (path, SnapshotFormat::Binary) => binary::read_images(&path)?,
            (path, SnapshotFormat::Text) => text::read_images(&path)?,
        };
        let points3d = match locate_required(dir, POINTS3D_FILE)? {
            (path, SnapshotFormat::Binary) => binary::read_points3d(&path)?,
            (path, SnapshotFormat::Text) => text::read_points3d(&path)?,
        };
        Ok(Self {
            cameras,
            images,
            points3d,
        })
    }

    /// Writes all three files to `dir`, creating it if needed.
    pub fn write(&self, dir: impl AsRef<Path>, format: SnapshotFormat) -> Result<(), SnapshotError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|source| SnapshotError::Io {
            path: dir.to_owned(),
            source,
        })?;
        let cameras = format.file(dir, CAMERAS_FILE);
        let images = format.file(dir, IMAGES_FILE);
        let points3d = format.file(dir, POINTS3D_FILE);
        match format {
            SnapshotFormat::Binary => {
                binary::write_cameras(&cameras, &self.cameras)?;
                binary::write_images(&images, &self.images)?;
                binary::write_points3d(&points3d, &self.points3d)?;
            }
            SnapshotFormat::Text => {
                text::write_cameras(&cameras, &self.cameras)?;
                text::write_images(&images, &self.images)?;
                text::write_points3d(&points3d, &self.points3d)?;
            }
        }
        Ok(())
    }

    /// Number of 2d points that observe a 3d point.
    pub fn num_observations(&self) -> usize {
        self.images
            .values()
            .flat_map(|image| image.points2d.iter())
            .filter(|point| point.track_id.is_some())
            .count()
    }
}

fn locate(dir: &Path, stem: &str) -> Option<(PathBuf, SnapshotFormat)> {
    [SnapshotFormat::Binary, SnapshotFormat::Text]
        .into_iter()
        .map(|format| (format.file(dir, stem), format))
        .find(|(path, _)| path.is_file())
}

fn locate_required(dir: &Path, stem: &str) -> Result<(PathBuf, SnapshotFormat), SnapshotError> {
    locate(dir, stem).ok_or_else(|| SnapshotError::MissingFile(dir.join(stem)))
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> SnapshotError + '_ {
    move |source| SnapshotError::Io {
        path: path.to_owned(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sfm_core::nalgebra::{Point2, Point3, Translation3, UnitQuaternion};
    use sfm_core::{CameraModel, Observation};
    use test_case::test_case;

    fn sample() -> Snapshot {
        let mut snapshot = Snapshot::new();
        snapshot.cameras.insert(
            1,
            Camera {
                camera_id: 1,
                model: CameraModel::SimpleRadial,
                width: 640,
                height: 480,
                params: vec![500.25, 320.0, 240.0, -0.0125],
            },
        );
        snapshot.images.insert(
            3,
            SnapshotImage {
                image_id: 3,
                camera_id: 1,
                name: "seq/img 003.png".to_owned(),
                cam_from_world: Isometry3::from_parts(
                    Translation3::new(0.25, -1.5, 3.0),
                    UnitQuaternion::from_euler_angles(0.1, 0.2, 0.3),
                ),
                points2d: vec![
                    Feature {
                        xy: Point2::new(10.5, 20.25),
                        track_id: Some(7),
                    },
                    Feature {
                        xy: Point2::new(1.0 / 3.0, 99.0),
                        track_id: None,
                    },
                ],
            },
        );
        snapshot.images.insert(
            4,
            SnapshotImage {
                image_id: 4,
                camera_id: 1,
                name: "lonely.png".to_owned(),
                cam_from_world: Isometry3::identity(),
                points2d: vec![],
            },
        );
        snapshot.points3d.insert(
            7,
            Track {
                track_id: 7,
                xyz: Point3::new(1.0, 2.0, -3.5e-7),
                color: [255, 0, 17],
                error: 0.75,
                observations: vec![Observation {
                    image_id: 3,
                    feature: 0,
                }],
            },
        );
        snapshot
    }

    #[test_case("bin", SnapshotFormat::Binary)]
    #[test_case("txt", SnapshotFormat::Text)]
    fn format_selector(selector: &str, format: SnapshotFormat) {
        assert_eq!(selector.parse::<SnapshotFormat>().unwrap(), format);
        assert_eq!(format.to_string(), selector);
    }

    #[test_case("ply")]
    #[test_case("BIN")]
    #[test_case("")]
    fn unknown_format_selector(selector: &str) {
        assert!(matches!(
            selector.parse::<SnapshotFormat>(),
            Err(SnapshotError::UnsupportedFormat(_))
        ));
    }

    #[test_case(SnapshotFormat::Binary)]
    #[test_case(SnapshotFormat::Text)]
    fn write_then_read(format: SnapshotFormat) {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = sample();
        snapshot.write(dir.path(), format).unwrap();
        assert!(Snapshot::files_present(dir.path()));
        assert_eq!(Snapshot::read(dir.path()).unwrap(), snapshot);
    }

    #[test]
    fn binary_is_preferred() {
        let dir = tempfile::tempdir().unwrap();
        sample().write(dir.path(), SnapshotFormat::Text).unwrap();
        Snapshot::new().write(dir.path(), SnapshotFormat::Binary).unwrap();
        assert!(Snapshot::read(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        sample().write(dir.path(), SnapshotFormat::Text).unwrap();
        fs::remove_file(dir.path().join("points3D.txt")).unwrap();
        assert!(!Snapshot::files_present(dir.path()));
        assert!(matches!(
            Snapshot::read(dir.path()),
            Err(SnapshotError::MissingFile(_))
        ));
    }
}
