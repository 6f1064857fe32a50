//! Line based encoding. Values are separated by single spaces and lines
//! starting with `#` are comments.
//!
//! Floating point values are printed in their shortest exact form, so a
//! written snapshot reads back bit for bit.

use super::{io_error, SnapshotImage};
use crate::SnapshotError;
use sfm_core::nalgebra::{Isometry3, Point2, Point3, Quaternion, Translation3, UnitQuaternion};
use sfm_core::{Camera, CameraId, CameraModel, Feature, ImageId, Observation, Track, TrackId};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::{FromStr, SplitWhitespace};

/// Id written for a 2d point that does not observe a 3d point.
const NO_POINT3D: i64 = -1;

pub(super) fn read_cameras(path: &Path) -> Result<BTreeMap<CameraId, Camera>, SnapshotError> {
    let contents = fs::read_to_string(path).map_err(io_error(path))?;
    let mut cameras = BTreeMap::new();
    for (line, text) in data_lines(&contents).filter(|(_, text)| !text.trim().is_empty()) {
        let mut tokens = Tokens::new(path, line, text);
        let camera_id = tokens.parse("camera id")?;
        let model: CameraModel = tokens.parse("camera model")?;
        let width = tokens.parse("width")?;
        let height = tokens.parse("height")?;
        let params = (0..model.num_params())
            .map(|_| tokens.parse("camera parameter"))
            .collect::<Result<Vec<f64>, _>>()?;
        tokens.finish()?;
        cameras.insert(
            camera_id,
            Camera {
                camera_id,
                model,
                width,
                height,
                params,
            },
        );
    }
    Ok(cameras)
}

pub(super) fn read_images(path: &Path) -> Result<BTreeMap<ImageId, SnapshotImage>, SnapshotError> {
    let contents = fs::read_to_string(path).map_err(io_error(path))?;
    let mut lines = data_lines(&contents);
    let mut images = BTreeMap::new();
    // Each image takes two lines, the second of which is empty for images without 2d points.
    while let Some((line, text)) = lines.find(|(_, text)| !text.trim().is_empty()) {
        let (head, name) = split_image_name(text).ok_or_else(|| SnapshotError::Parse {
            path: path.to_owned(),
            line,
            message: "missing image name".to_owned(),
        })?;
        let mut tokens = Tokens::new(path, line, head);
        let image_id = tokens.parse("image id")?;
        let q: [f64; 4] = [
            tokens.parse("qw")?,
            tokens.parse("qx")?,
            tokens.parse("qy")?,
            tokens.parse("qz")?,
        ];
        let t = Translation3::new(tokens.parse("tx")?, tokens.parse("ty")?, tokens.parse("tz")?);
        let camera_id = tokens.parse("camera id")?;
        tokens.finish()?;
        let name = name.to_owned();

        let points2d = match lines.next() {
            Some((line, text)) => read_points2d(path, line, text)?,
            None => vec![],
        };
        let rotation = UnitQuaternion::new_unchecked(Quaternion::new(q[0], q[1], q[2], q[3]));
        images.insert(
            image_id,
            SnapshotImage {
                image_id,
                camera_id,
                name,
                cam_from_world: Isometry3::from_parts(t, rotation),
                points2d,
            },
        );
    }
    Ok(images)
}

fn read_points2d(path: &Path, line: usize, text: &str) -> Result<Vec<Feature>, SnapshotError> {
    let mut tokens = Tokens::new(path, line, text);
    let mut points2d = vec![];
    while !tokens.is_empty() {
        let x = tokens.parse("x")?;
        let y = tokens.parse("y")?;
        let point3d_id: i64 = tokens.parse("point3D id")?;
        let track_id = match point3d_id {
            NO_POINT3D => None,
            id => Some(
                TrackId::try_from(id)
                    .map_err(|_| tokens.error(format!("invalid point3D id {}", id)))?,
            ),
        };
        points2d.push(Feature {
            xy: Point2::new(x, y),
            track_id,
        });
    }
    Ok(points2d)
}

pub(super) fn read_points3d(path: &Path) -> Result<BTreeMap<TrackId, Track>, SnapshotError> {
    let contents = fs::read_to_string(path).map_err(io_error(path))?;
    let mut points3d = BTreeMap::new();
    for (line, text) in data_lines(&contents).filter(|(_, text)| !text.trim().is_empty()) {
        let mut tokens = Tokens::new(path, line, text);
        let track_id = tokens.parse("point3D id")?;
        let xyz = Point3::new(tokens.parse("x")?, tokens.parse("y")?, tokens.parse("z")?);
        let color = [tokens.parse("r")?, tokens.parse("g")?, tokens.parse("b")?];
        let error = tokens.parse("error")?;
        let mut observations = vec![];
        while !tokens.is_empty() {
            observations.push(Observation {
                image_id: tokens.parse("image id")?,
                feature: tokens.parse("point2D index")?,
            });
        }
        points3d.insert(
            track_id,
            Track {
                track_id,
                xyz,
                color,
                error,
                observations,
            },
        );
    }
    Ok(points3d)
}

pub(super) fn write_cameras(
    path: &Path,
    cameras: &BTreeMap<CameraId, Camera>,
) -> Result<(), SnapshotError> {
    write_file(path, |w| {
        writeln!(w, "# Camera list with one line of data per camera:")?;
        writeln!(w, "#   CAMERA_ID, MODEL, WIDTH, HEIGHT, PARAMS[]")?;
        writeln!(w, "# Number of cameras: {}", cameras.len())?;
        for camera in cameras.values() {
            write!(
                w,
                "{} {} {} {}",
                camera.camera_id, camera.model, camera.width, camera.height
            )?;
            write_values(w, &camera.params)?;
            writeln!(w)?;
        }
        Ok(())
    })
}

pub(super) fn write_images(
    path: &Path,
    images: &BTreeMap<ImageId, SnapshotImage>,
) -> Result<(), SnapshotError> {
    let num_observations: usize = images
        .values()
        .map(|image| image.points2d.iter().filter(|p| p.track_id.is_some()).count())
        .sum();
    let mean_observations = if images.is_empty() {
        0.0
    } else {
        num_observations as f64 / images.len() as f64
    };
    write_file(path, |w| {
        writeln!(w, "# Image list with two lines of data per image:")?;
        writeln!(w, "#   IMAGE_ID, QW, QX, QY, QZ, TX, TY, TZ, CAMERA_ID, NAME")?;
        writeln!(w, "#   POINTS2D[] as (X, Y, POINT3D_ID)")?;
        writeln!(
            w,
            "# Number of images: {}, mean observations per image: {}",
            images.len(),
            mean_observations
        )?;
        for image in images.values() {
            let q = image.cam_from_world.rotation.quaternion();
            let t = &image.cam_from_world.translation.vector;
            write!(w, "{}", image.image_id)?;
            write_values(w, &[q.w, q.i, q.j, q.k, t.x, t.y, t.z])?;
            writeln!(w, " {} {}", image.camera_id, image.name)?;
            let mut separator = "";
            for point in &image.points2d {
                let point3d_id = point.track_id.map_or(NO_POINT3D.to_string(), |id| id.to_string());
                write!(w, "{}{} {} {}", separator, point.xy.x, point.xy.y, point3d_id)?;
                separator = " ";
            }
            writeln!(w)?;
        }
        Ok(())
    })
}

pub(super) fn write_points3d(
    path: &Path,
    points3d: &BTreeMap<TrackId, Track>,
) -> Result<(), SnapshotError> {
    let track_length: usize = points3d.values().map(|p| p.observations.len()).sum();
    let mean_track_length = if points3d.is_empty() {
        0.0
    } else {
        track_length as f64 / points3d.len() as f64
    };
    write_file(path, |w| {
        writeln!(w, "# 3D point list with one line of data per point:")?;
        writeln!(
            w,
            "#   POINT3D_ID, X, Y, Z, R, G, B, ERROR, TRACK[] as (IMAGE_ID, POINT2D_IDX)"
        )?;
        writeln!(
            w,
            "# Number of points: {}, mean track length: {}",
            points3d.len(),
            mean_track_length
        )?;
        for point in points3d.values() {
            let [r, g, b] = point.color;
            write!(w, "{}", point.track_id)?;
            write_values(w, &[point.xyz.x, point.xyz.y, point.xyz.z])?;
            write!(w, " {} {} {} {}", r, g, b, point.error)?;
            for observation in &point.observations {
                write!(w, " {} {}", observation.image_id, observation.feature)?;
            }
            writeln!(w)?;
        }
        Ok(())
    })
}

fn write_file(
    path: &Path,
    body: impl FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
) -> Result<(), SnapshotError> {
    let mut writer = BufWriter::new(File::create(path).map_err(io_error(path))?);
    body(&mut writer)
        .and_then(|()| writer.flush())
        .map_err(io_error(path))
}

fn write_values<T: Display>(w: &mut impl Write, values: &[T]) -> std::io::Result<()> {
    for value in values {
        write!(w, " {}", value)?;
    }
    Ok(())
}

/// Splits an image line into its nine leading values and the image name,
/// which may itself contain spaces.
fn split_image_name(text: &str) -> Option<(&str, &str)> {
    let text = text.trim();
    let mut end = 0;
    for _ in 0..9 {
        let rest = &text[end..];
        let start = end + (rest.len() - rest.trim_start().len());
        end = start + text[start..].find(char::is_whitespace)?;
    }
    let name = text[end..].trim();
    (!name.is_empty()).then(|| (&text[..end], name))
}

/// Non-comment lines with their one-based line numbers.
fn data_lines(contents: &str) -> impl Iterator<Item = (usize, &str)> {
    contents
        .lines()
        .enumerate()
        .map(|(ix, text)| (ix + 1, text))
        .filter(|(_, text)| !text.trim_start().starts_with('#'))
}

struct Tokens<'a> {
    path: &'a Path,
    line: usize,
    tokens: SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn new(path: &'a Path, line: usize, text: &'a str) -> Self {
        Self {
            path,
            line,
            tokens: text.split_whitespace(),
        }
    }

    fn parse<T: FromStr>(&mut self, what: &str) -> Result<T, SnapshotError> {
        let token = self
            .tokens
            .next()
            .ok_or_else(|| self.error(format!("missing {}", what)))?;
        token
            .parse()
            .map_err(|_| self.error(format!("invalid {} {:?}", what, token)))
    }

    fn is_empty(&self) -> bool {
        self.tokens.clone().next().is_none()
    }

    fn finish(&self) -> Result<(), SnapshotError> {
        match self.tokens.clone().next() {
            None => Ok(()),
            Some(token) => Err(self.error(format!("unexpected trailing value {:?}", token))),
        }
    }

    fn error(&self, message: String) -> SnapshotError {
        SnapshotError::Parse {
            path: self.path.to_owned(),
            line: self.line,
            message,
        }
    }
}
