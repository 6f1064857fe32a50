use crate::{CameraId, RigId};
use nalgebra::Isometry3;
use std::collections::BTreeMap;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// A set of cameras mounted rigidly with respect to each other.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Rig {
    pub rig_id: RigId,
    /// The camera whose frame defines the rig frame.
    pub ref_camera_id: CameraId,
    /// Other cameras of the rig and their pose relative to the rig, if known.
    pub sensors: BTreeMap<CameraId, Option<Isometry3<f64>>>,
}

impl Rig {
    /// A rig made of a single camera.
    pub fn single(rig_id: RigId, camera_id: CameraId) -> Self {
        Self {
            rig_id,
            ref_camera_id: camera_id,
            sensors: BTreeMap::new(),
        }
    }

    /// The pose of a camera relative to the rig.
    ///
    /// The reference camera is the identity. Returns `None` for cameras that
    /// are not part of the rig or whose pose is not known yet.
    pub fn sensor_from_rig(&self, camera_id: CameraId) -> Option<Isometry3<f64>> {
        if camera_id == self.ref_camera_id {
            Some(Isometry3::identity())
        } else {
            self.sensors.get(&camera_id).copied().flatten()
        }
    }
}
