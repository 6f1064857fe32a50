//! Little-endian binary encoding. Every file starts with a `u64` record count.

use super::{io_error, SnapshotImage};
use crate::binary::{read_rigid3, read_vector3, write_rigid3, write_vector3};
use crate::SnapshotError;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use sfm_core::nalgebra::{Point2, Point3};
use sfm_core::{Camera, CameraId, CameraModel, Feature, ImageId, Observation, Track, TrackId};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

type Endian = LittleEndian;

/// Id stored for a 2d point that does not observe a 3d point.
const NO_POINT3D: u64 = u64::MAX;

/// Records preallocated before their data has been seen.
const MAX_PREALLOCATION: usize = 1 << 16;

pub(super) fn read_cameras(path: &Path) -> Result<BTreeMap<CameraId, Camera>, SnapshotError> {
    read_file(path, |r| {
        let count = r.read_u64::<Endian>()?;
        let mut cameras = BTreeMap::new();
        for _ in 0..count {
            let camera_id = r.read_u32::<Endian>()?;
            let model_id = r.read_i32::<Endian>()?;
            let model = CameraModel::from_model_id(model_id)
                .ok_or_else(|| malformed(format!("unknown camera model id {}", model_id)))?;
            let width = r.read_u64::<Endian>()?;
            let height = r.read_u64::<Endian>()?;
            let mut params = vec![0.0; model.num_params()];
            r.read_f64_into::<Endian>(&mut params)?;
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
    })
}

pub(super) fn read_images(path: &Path) -> Result<BTreeMap<ImageId, SnapshotImage>, SnapshotError> {
    read_file(path, |r| {
        let count = r.read_u64::<Endian>()?;
        let mut images = BTreeMap::new();
        for _ in 0..count {
            let image_id = r.read_u32::<Endian>()?;
            let cam_from_world = read_rigid3::<Endian>(r)?;
            let camera_id = r.read_u32::<Endian>()?;
            let name = read_name(r)?;
            let num_points2d = r.read_u64::<Endian>()?;
            let mut points2d = Vec::with_capacity(capacity(num_points2d));
            for _ in 0..num_points2d {
                let x = r.read_f64::<Endian>()?;
                let y = r.read_f64::<Endian>()?;
                let point3d_id = r.read_u64::<Endian>()?;
                points2d.push(Feature {
                    xy: Point2::new(x, y),
                    track_id: (point3d_id != NO_POINT3D).then(|| point3d_id),
                });
            }
            images.insert(
                image_id,
                SnapshotImage {
                    image_id,
                    camera_id,
                    name,
                    cam_from_world,
                    points2d,
                },
            );
        }
        Ok(images)
    })
}

pub(super) fn read_points3d(path: &Path) -> Result<BTreeMap<TrackId, Track>, SnapshotError> {
    read_file(path, |r| {
        let count = r.read_u64::<Endian>()?;
        let mut points3d = BTreeMap::new();
        for _ in 0..count {
            let track_id = r.read_u64::<Endian>()?;
            let xyz = Point3::from(read_vector3::<Endian>(r)?);
            let mut color = [0; 3];
            r.read_exact(&mut color)?;
            let error = r.read_f64::<Endian>()?;
            let track_length = r.read_u64::<Endian>()?;
            let mut observations = Vec::with_capacity(capacity(track_length));
            for _ in 0..track_length {
                observations.push(Observation {
                    image_id: r.read_u32::<Endian>()?,
                    feature: r.read_u32::<Endian>()?,
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
    })
}

pub(super) fn write_cameras(
    path: &Path,
    cameras: &BTreeMap<CameraId, Camera>,
) -> Result<(), SnapshotError> {
    write_file(path, |w| {
        w.write_u64::<Endian>(cameras.len() as u64)?;
        for camera in cameras.values() {
            w.write_u32::<Endian>(camera.camera_id)?;
            w.write_i32::<Endian>(camera.model.model_id())?;
            w.write_u64::<Endian>(camera.width)?;
            w.write_u64::<Endian>(camera.height)?;
            for &param in &camera.params {
                w.write_f64::<Endian>(param)?;
            }
        }
        Ok(())
    })
}

pub(super) fn write_images(
    path: &Path,
    images: &BTreeMap<ImageId, SnapshotImage>,
) -> Result<(), SnapshotError> {
    write_file(path, |w| {
        w.write_u64::<Endian>(images.len() as u64)?;
        for image in images.values() {
            w.write_u32::<Endian>(image.image_id)?;
            write_rigid3::<Endian>(w, &image.cam_from_world)?;
            w.write_u32::<Endian>(image.camera_id)?;
            w.write_all(image.name.as_bytes())?;
            w.write_u8(0)?;
            w.write_u64::<Endian>(image.points2d.len() as u64)?;
            for point in &image.points2d {
                w.write_f64::<Endian>(point.xy.x)?;
                w.write_f64::<Endian>(point.xy.y)?;
                w.write_u64::<Endian>(point.track_id.unwrap_or(NO_POINT3D))?;
            }
        }
        Ok(())
    })
}

pub(super) fn write_points3d(
    path: &Path,
    points3d: &BTreeMap<TrackId, Track>,
) -> Result<(), SnapshotError> {
    write_file(path, |w| {
        w.write_u64::<Endian>(points3d.len() as u64)?;
        for point in points3d.values() {
            w.write_u64::<Endian>(point.track_id)?;
            write_vector3::<Endian>(w, &point.xyz.coords)?;
            w.write_all(&point.color)?;
            w.write_f64::<Endian>(point.error)?;
            w.write_u64::<Endian>(point.observations.len() as u64)?;
            for observation in &point.observations {
                w.write_u32::<Endian>(observation.image_id)?;
                w.write_u32::<Endian>(observation.feature)?;
            }
        }
        Ok(())
    })
}

/// Zero terminated UTF-8 name.
fn read_name(r: &mut impl BufRead) -> io::Result<String> {
    let mut bytes = vec![];
    r.read_until(0, &mut bytes)?;
    if bytes.pop() != Some(0) {
        return Err(io::ErrorKind::UnexpectedEof.into());
    }
    String::from_utf8(bytes).map_err(|_| malformed("image name is not valid UTF-8".to_owned()))
}

fn capacity(count: u64) -> usize {
    usize::try_from(count).map_or(MAX_PREALLOCATION, |count| count.min(MAX_PREALLOCATION))
}

/// Content errors travel as `InvalidData` until they are attached to the file path.
fn malformed(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}

fn read_file<T>(
    path: &Path,
    body: impl FnOnce(&mut BufReader<File>) -> io::Result<T>,
) -> Result<T, SnapshotError> {
    let mut reader = BufReader::new(File::open(path).map_err(io_error(path))?);
    body(&mut reader).map_err(|e| match e.kind() {
        io::ErrorKind::InvalidData => SnapshotError::Malformed {
            path: path.to_owned(),
            message: e.to_string(),
        },
        io::ErrorKind::UnexpectedEof => SnapshotError::Malformed {
            path: path.to_owned(),
            message: "file ends inside a record".to_owned(),
        },
        _ => io_error(path)(e),
    })
}

fn write_file(
    path: &Path,
    body: impl FnOnce(&mut BufWriter<File>) -> io::Result<()>,
) -> Result<(), SnapshotError> {
    let mut writer = BufWriter::new(File::create(path).map_err(io_error(path))?);
    body(&mut writer)
        .and_then(|()| writer.flush())
        .map_err(io_error(path))
}
