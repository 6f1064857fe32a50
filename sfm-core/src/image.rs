use crate::{CameraId, FrameId, ImageId, TrackId};
use nalgebra::Point2;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// A 2d feature observed in an image.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Feature {
    /// Pixel coordinates, with the center of the top-left pixel at `(0.5, 0.5)`.
    pub xy: Point2<f64>,
    /// The track this feature contributes to.
    pub track_id: Option<TrackId>,
}

/// A single camera observation belonging to a [`Frame`](crate::Frame).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Image {
    pub image_id: ImageId,
    pub camera_id: CameraId,
    pub frame_id: FrameId,
    /// Path of the image relative to the image root.
    pub name: String,
    pub features: Vec<Feature>,
}

impl Image {
    pub fn new(
        image_id: ImageId,
        camera_id: CameraId,
        frame_id: FrameId,
        name: impl Into<String>,
    ) -> Self {
        Self {
            image_id,
            camera_id,
            frame_id,
            name: name.into(),
            features: Vec::new(),
        }
    }

    pub fn num_tracked_features(&self) -> usize {
        self.features
            .iter()
            .filter(|feature| feature.track_id.is_some())
            .count()
    }
}
