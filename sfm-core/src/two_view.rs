use nalgebra::{Isometry3, Matrix3};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// The motion model that best explains a pair of views.
///
/// The discriminants are the values persisted on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[repr(i32)]
pub enum TwoViewConfig {
    #[default]
    Undefined = 0,
    /// Too few inliers for any model.
    Degenerate = 1,
    /// Essential matrix with known intrinsics.
    Calibrated = 2,
    /// Fundamental matrix only.
    Uncalibrated = 3,
    /// Homography of a planar scene.
    Planar = 4,
    /// Homography of a pure rotation.
    Panoramic = 5,
    PlanarOrPanoramic = 6,
    /// Matches concentrated on an image border watermark.
    Watermark = 7,
    /// Several configurations are plausible.
    Multiple = 8,
}

impl TwoViewConfig {
    pub fn from_i32(value: i32) -> Option<Self> {
        use TwoViewConfig::*;
        Some(match value {
            0 => Undefined,
            1 => Degenerate,
            2 => Calibrated,
            3 => Uncalibrated,
            4 => Planar,
            5 => Panoramic,
            6 => PlanarOrPanoramic,
            7 => Watermark,
            8 => Multiple,
            _ => return None,
        })
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Whether the relative pose of a pair with this configuration carries a
    /// usable rotation.
    pub fn has_rotation(self) -> bool {
        matches!(
            self,
            TwoViewConfig::Calibrated
                | TwoViewConfig::Uncalibrated
                | TwoViewConfig::Planar
                | TwoViewConfig::Panoramic
                | TwoViewConfig::PlanarOrPanoramic
        )
    }
}

/// Two-view geometry of an image pair, expressed from the first image to the second.
///
/// All three matrices are always stored; which of them is meaningful depends on
/// [`TwoViewGeometry::config`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct TwoViewGeometry {
    pub config: TwoViewConfig,
    pub essential: Matrix3<f64>,
    pub fundamental: Matrix3<f64>,
    pub homography: Matrix3<f64>,
    /// Transforms points in the first camera frame into the second camera frame.
    pub cam2_from_cam1: Isometry3<f64>,
}

impl Default for TwoViewGeometry {
    fn default() -> Self {
        Self {
            config: TwoViewConfig::Undefined,
            essential: Matrix3::zeros(),
            fundamental: Matrix3::zeros(),
            homography: Matrix3::identity(),
            cam2_from_cam1: Isometry3::identity(),
        }
    }
}

impl TwoViewGeometry {
    /// Expresses the geometry from the second image to the first.
    ///
    /// A singular homography is left unchanged since it has no inverse.
    #[must_use]
    pub fn inverse(&self) -> Self {
        Self {
            config: self.config,
            essential: self.essential.transpose(),
            fundamental: self.fundamental.transpose(),
            homography: self.homography.try_inverse().unwrap_or(self.homography),
            cam2_from_cam1: self.cam2_from_cam1.inverse(),
        }
    }
}
