//! Binary artifact for the state a sparse snapshot has no place for.
//!
//! A snapshot stores cameras, posed images and 3d points, but neither the view
//! graph nor the cluster and gravity metadata of frames. Both are written to
//! [`AUX_STATE_FILE`] next to the snapshot. The layout, with every value in
//! native byte order and no padding, is:
//!
//! ```text
//! u64 pair_count
//! pair_count x {
//!     u32 image_id1, u32 image_id2, u8 is_valid, f64 weight, i32 config,
//!     f64[9] essential, f64[9] fundamental, f64[9] homography (row-major),
//!     f64[4] rotation (w, x, y, z), f64[3] translation,
//!     u64 match_count, (i32, i32)[match_count],
//!     u64 inlier_count, i32[inlier_count],
//! }
//! u64 frame_count
//! frame_count x { u32 frame_id, i32 cluster_id, u8 has_gravity, f64[3] gravity if has_gravity }
//! ```
//!
//! Older artifacts end right after the pairs. They are still accepted and leave
//! the frames untouched.
//!
//! [`AuxFormat::Versioned`] prefixes the same body with an eight byte magic and
//! a `u32` version, and always carries the frame section. Readers accept both
//! forms. Neither form has a checksum.

use crate::binary::{self, FlagError, LengthError};
use crate::CodecError;
use byteorder::{ByteOrder, NativeEndian, ReadBytesExt, WriteBytesExt};
use log::*;
use sfm_core::nalgebra::Vector3;
use sfm_core::{Frame, FrameId, ImagePair, TwoViewConfig, TwoViewGeometry, ViewGraph};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// File name of the artifact inside a checkpoint directory.
pub const AUX_STATE_FILE: &str = "view_graph.bin";

/// Leading bytes of the versioned form.
///
/// Read as a pair count this is far beyond anything that fits on a disk, so it
/// cannot be mistaken for the start of the legacy form.
pub const AUX_STATE_MAGIC: [u8; 8] = *b"GSFMAUX\0";

/// Version written by [`AuxFormat::Versioned`].
pub const AUX_STATE_VERSION: u32 = 1;

/// Size of a serialized gravity vector.
const GRAVITY_BYTES: u64 = 3 * 8;

type Endian = NativeEndian;

/// Which form of the artifact to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde-serialize", serde(rename_all = "snake_case"))]
pub enum AuxFormat {
    /// No header; the frame section may be absent when reading.
    #[default]
    Legacy,
    /// Magic and version header, frame section mandatory.
    Versioned,
}

/// What a successful read found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuxStateSummary {
    pub format: AuxFormat,
    pub num_pairs: usize,
    /// `false` for legacy artifacts that end after the pairs.
    pub has_frame_section: bool,
    pub num_frames_updated: usize,
    /// Frame records whose id is not in the frame mapping.
    pub num_frames_skipped: usize,
}

/// Writes the legacy form of the artifact to `path`.
pub fn write_aux_state(
    path: impl AsRef<Path>,
    view_graph: &ViewGraph,
    frames: &HashMap<FrameId, Frame>,
) -> Result<(), CodecError> {
    write_aux_state_with(path, view_graph, frames, AuxFormat::Legacy)
}

pub fn write_aux_state_with(
    path: impl AsRef<Path>,
    view_graph: &ViewGraph,
    frames: &HashMap<FrameId, Frame>,
    format: AuxFormat,
) -> Result<(), CodecError> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    encode_aux_state(&mut writer, view_graph, frames, format)?;
    writer.flush()?;
    debug!(
        "wrote {} image pairs and {} frames to {}",
        view_graph.len(),
        frames.len(),
        path.display()
    );
    Ok(())
}

pub fn encode_aux_state(
    writer: &mut impl Write,
    view_graph: &ViewGraph,
    frames: &HashMap<FrameId, Frame>,
    format: AuxFormat,
) -> Result<(), CodecError> {
    if format == AuxFormat::Versioned {
        writer.write_all(&AUX_STATE_MAGIC)?;
        writer.write_u32::<Endian>(AUX_STATE_VERSION)?;
    }

    writer.write_u64::<Endian>(view_graph.len() as u64)?;
    for pair in view_graph.pairs() {
        write_pair(writer, pair)?;
    }

    // Frames are written in id order so identical state gives identical bytes.
    let mut frame_ids: Vec<FrameId> = frames.keys().copied().collect();
    frame_ids.sort_unstable();
    writer.write_u64::<Endian>(frame_ids.len() as u64)?;
    for frame in frame_ids.iter().filter_map(|id| frames.get(id)) {
        writer.write_u32::<Endian>(frame.frame_id)?;
        writer.write_i32::<Endian>(frame.cluster_id)?;
        binary::write_optional_vector3::<Endian>(writer, frame.gravity.as_ref())?;
    }
    Ok(())
}

fn write_pair(writer: &mut impl Write, pair: &ImagePair) -> io::Result<()> {
    writer.write_u32::<Endian>(pair.image_id1())?;
    writer.write_u32::<Endian>(pair.image_id2())?;
    writer.write_u8(u8::from(pair.is_valid()))?;
    writer.write_f64::<Endian>(pair.weight())?;
    writer.write_i32::<Endian>(pair.config().as_i32())?;
    binary::write_matrix3::<Endian>(writer, pair.essential())?;
    binary::write_matrix3::<Endian>(writer, pair.fundamental())?;
    binary::write_matrix3::<Endian>(writer, pair.homography())?;
    binary::write_rigid3::<Endian>(writer, pair.cam2_from_cam1())?;
    binary::write_index_pairs::<Endian>(writer, pair.matches())?;
    binary::write_indices::<Endian>(writer, pair.inliers())
}

/// Reads the artifact at `path` into `view_graph` and `frames`.
///
/// The view graph is replaced. Frames are updated in place; records for frame
/// ids missing from `frames` are skipped. On error neither argument is modified.
pub fn read_aux_state(
    path: impl AsRef<Path>,
    view_graph: &mut ViewGraph,
    frames: &mut HashMap<FrameId, Frame>,
) -> Result<AuxStateSummary, CodecError> {
    let path = path.as_ref();
    let mut reader = BufReader::new(File::open(path)?);
    let summary = decode_aux_state(&mut reader, view_graph, frames)?;
    debug!(
        "read {} image pairs from {} ({:?}, frame section: {})",
        summary.num_pairs,
        path.display(),
        summary.format,
        summary.has_frame_section
    );
    Ok(summary)
}

/// Frame metadata decoded from one record, applied once the whole stream is valid.
struct FrameUpdate {
    frame_id: FrameId,
    cluster_id: i32,
    gravity: Option<Vector3<f64>>,
}

pub fn decode_aux_state(
    reader: &mut impl Read,
    view_graph: &mut ViewGraph,
    frames: &mut HashMap<FrameId, Frame>,
) -> Result<AuxStateSummary, CodecError> {
    let mut head = [0u8; 8];
    reader.read_exact(&mut head).in_section("header")?;
    let (format, num_pairs) = if head == AUX_STATE_MAGIC {
        let version = reader.read_u32::<Endian>().in_section("header")?;
        if version != AUX_STATE_VERSION {
            return Err(CodecError::UnsupportedVersion(version));
        }
        let num_pairs = reader.read_u64::<Endian>().in_section("header")?;
        (AuxFormat::Versioned, num_pairs)
    } else {
        (AuxFormat::Legacy, Endian::read_u64(&head))
    };

    let mut decoded = ViewGraph::new();
    for _ in 0..num_pairs {
        let pair = read_pair(reader)?;
        if let Some(previous) = decoded.insert(pair) {
            warn!(
                "image pair ({}, {}) stored twice, keeping the later record",
                previous.image_id1(),
                previous.image_id2()
            );
        }
    }

    let num_frames = match binary::read_u64_or_eof::<Endian>(reader).in_section("frames")? {
        Some(num_frames) => Some(num_frames),
        None if format == AuxFormat::Legacy => None,
        None => return Err(CodecError::MissingFrameSection),
    };

    let mut updates = vec![];
    let mut num_frames_skipped = 0;
    for _ in 0..num_frames.unwrap_or(0) {
        let frame_id = reader.read_u32::<Endian>().in_section("frames")?;
        let cluster_id = reader.read_i32::<Endian>().in_section("frames")?;
        let has_gravity = flag(binary::read_bool(reader), "has_gravity")?;
        if frames.contains_key(&frame_id) {
            let gravity = if has_gravity {
                Some(binary::read_vector3::<Endian>(reader).in_section("frames")?)
            } else {
                None
            };
            updates.push(FrameUpdate {
                frame_id,
                cluster_id,
                gravity,
            });
        } else {
            if has_gravity {
                binary::skip_bytes(reader, GRAVITY_BYTES).in_section("frames")?;
            }
            num_frames_skipped += 1;
        }
    }
    if num_frames_skipped > 0 {
        warn!(
            "{} frame records refer to unknown frames and were skipped",
            num_frames_skipped
        );
    }

    *view_graph = decoded;
    let num_frames_updated = updates.len();
    for update in updates {
        if let Some(frame) = frames.get_mut(&update.frame_id) {
            frame.cluster_id = update.cluster_id;
            frame.gravity = update.gravity;
        }
    }

    Ok(AuxStateSummary {
        format,
        num_pairs: view_graph.len(),
        has_frame_section: num_frames.is_some(),
        num_frames_updated,
        num_frames_skipped,
    })
}

fn read_pair(reader: &mut impl Read) -> Result<ImagePair, CodecError> {
    let image_id1 = reader.read_u32::<Endian>().in_section("pairs")?;
    let image_id2 = reader.read_u32::<Endian>().in_section("pairs")?;
    let is_valid = flag(binary::read_bool(reader), "is_valid")?;
    let weight = reader.read_f64::<Endian>().in_section("pairs")?;
    let config = reader.read_i32::<Endian>().in_section("pairs")?;
    let config = TwoViewConfig::from_i32(config).ok_or(CodecError::UnknownConfig(config))?;
    let essential = binary::read_matrix3::<Endian>(reader).in_section("pairs")?;
    let fundamental = binary::read_matrix3::<Endian>(reader).in_section("pairs")?;
    let homography = binary::read_matrix3::<Endian>(reader).in_section("pairs")?;
    let cam2_from_cam1 = binary::read_rigid3::<Endian>(reader).in_section("pairs")?;
    let matches = length(binary::read_index_pairs::<Endian>(reader), "matches")?;
    let inliers = length(binary::read_indices::<Endian>(reader), "inliers")?;

    Ok(ImagePair::new(image_id1, image_id2)?
        .with_validity(is_valid)
        .with_weight(weight)
        .with_geometry(TwoViewGeometry {
            config,
            essential,
            fundamental,
            homography,
            cam2_from_cam1,
        })
        .with_matches(matches)
        .with_inliers(inliers))
}

trait InSection<T> {
    /// Maps an early end of stream to [`CodecError::Truncated`].
    fn in_section(self, section: &'static str) -> Result<T, CodecError>;
}

impl<T> InSection<T> for io::Result<T> {
    fn in_section(self, section: &'static str) -> Result<T, CodecError> {
        self.map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => CodecError::Truncated(section),
            _ => CodecError::Io(e),
        })
    }
}

fn length<T>(result: Result<T, LengthError>, section: &'static str) -> Result<T, CodecError> {
    match result {
        Ok(value) => Ok(value),
        Err(LengthError::Io(e)) => Err::<T, _>(e).in_section(section),
        Err(LengthError::Overflow(len)) => Err(CodecError::LengthOverflow(len)),
    }
}

fn flag(result: Result<bool, FlagError>, field: &'static str) -> Result<bool, CodecError> {
    match result {
        Ok(value) => Ok(value),
        Err(FlagError::Io(e)) => Err::<bool, _>(e).in_section(field),
        Err(FlagError::Invalid(value)) => Err(CodecError::InvalidFlag { field, value }),
    }
}
