use crate::{ImageId, TrackId};
use nalgebra::Point3;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// One image's observation of a track: the image and the feature index in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Observation {
    pub image_id: ImageId,
    pub feature: u32,
}

/// A 3d point in space that has been observed in two or more images.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Track {
    pub track_id: TrackId,
    pub xyz: Point3<f64>,
    pub color: [u8; 3],
    /// Mean reprojection error in pixels, negative if unknown.
    pub error: f64,
    pub observations: Vec<Observation>,
}
