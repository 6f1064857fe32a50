use crate::{FrameId, ImageId, RigId, UNCLUSTERED};
use nalgebra::{Isometry3, Vector3};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// Images captured at the same instant by one rig.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Frame {
    pub frame_id: FrameId,
    pub rig_id: RigId,
    pub image_ids: Vec<ImageId>,
    /// Present once the frame has been registered.
    pub rig_from_world: Option<Isometry3<f64>>,
    /// Component assigned by pruning, [`UNCLUSTERED`] until then.
    pub cluster_id: i32,
    /// Measured gravity direction in the rig frame.
    pub gravity: Option<Vector3<f64>>,
}

impl Frame {
    pub fn new(frame_id: FrameId, rig_id: RigId) -> Self {
        Self {
            frame_id,
            rig_id,
            image_ids: Vec::new(),
            rig_from_world: None,
            cluster_id: UNCLUSTERED,
            gravity: None,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.rig_from_world.is_some()
    }

    pub fn is_clustered(&self) -> bool {
        self.cluster_id != UNCLUSTERED
    }
}
