use crate::{
    Camera, CameraId, Frame, FrameId, Image, ImageId, Rig, RigId, Track, TrackId, UNCLUSTERED,
};
use nalgebra::Isometry3;
use std::collections::HashMap;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// The entity mappings a reconstruction is made of.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Scene {
    pub rigs: HashMap<RigId, Rig>,
    pub cameras: HashMap<CameraId, Camera>,
    pub frames: HashMap<FrameId, Frame>,
    pub images: HashMap<ImageId, Image>,
    pub tracks: HashMap<TrackId, Track>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// The largest cluster id of any frame, [`UNCLUSTERED`] if none is clustered.
    pub fn max_cluster_id(&self) -> i32 {
        self.frames
            .values()
            .map(|frame| frame.cluster_id)
            .max()
            .unwrap_or(UNCLUSTERED)
            .max(UNCLUSTERED)
    }

    pub fn frame_of_image(&self, image_id: ImageId) -> Option<&Frame> {
        self.images
            .get(&image_id)
            .and_then(|image| self.frames.get(&image.frame_id))
    }

    pub fn is_image_registered(&self, image_id: ImageId) -> bool {
        self.frame_of_image(image_id)
            .map_or(false, Frame::is_registered)
    }

    /// Pose of an image's camera: the rig pose of its frame composed with the
    /// camera's pose in the rig.
    pub fn cam_from_world(&self, image_id: ImageId) -> Option<Isometry3<f64>> {
        let image = self.images.get(&image_id)?;
        let frame = self.frames.get(&image.frame_id)?;
        let rig_from_world = frame.rig_from_world?;
        let sensor_from_rig = match self.rigs.get(&frame.rig_id) {
            Some(rig) => rig.sensor_from_rig(image.camera_id)?,
            None => Isometry3::identity(),
        };
        Some(sensor_from_rig * rig_from_world)
    }

    pub fn num_registered_frames(&self) -> usize {
        self.frames.values().filter(|frame| frame.is_registered()).count()
    }

    /// Drops every entity, leaving an empty scene.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
