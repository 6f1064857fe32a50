use serde::{Deserialize, Serialize};
use std::fmt;

/// The stages of the global pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Preprocessing,
    ViewGraphCalibration,
    RelativePoseEstimation,
    RotationAveraging,
    TrackEstablishment,
    GlobalPositioning,
    BundleAdjustment,
    Retriangulation,
    /// Splits the reconstruction into clusters.
    Pruning,
}

impl Stage {
    pub const ALL: [Stage; 9] = [
        Stage::Preprocessing,
        Stage::ViewGraphCalibration,
        Stage::RelativePoseEstimation,
        Stage::RotationAveraging,
        Stage::TrackEstablishment,
        Stage::GlobalPositioning,
        Stage::BundleAdjustment,
        Stage::Retriangulation,
        Stage::Pruning,
    ];

    /// The last stage that a resumed run may skip.
    pub const LAST_SKIPPABLE: Stage = Stage::BundleAdjustment;

    pub fn name(self) -> &'static str {
        match self {
            Stage::Preprocessing => "preprocessing",
            Stage::ViewGraphCalibration => "view graph calibration",
            Stage::RelativePoseEstimation => "relative pose estimation",
            Stage::RotationAveraging => "rotation averaging",
            Stage::TrackEstablishment => "track establishment",
            Stage::GlobalPositioning => "global positioning",
            Stage::BundleAdjustment => "bundle adjustment",
            Stage::Retriangulation => "retriangulation",
            Stage::Pruning => "pruning",
        }
    }

    pub fn is_skippable(self) -> bool {
        self <= Self::LAST_SKIPPABLE
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which stages a run skips.
///
/// Only a prefix of the pipeline can be skipped, and never more than
/// [`Stage::LAST_SKIPPABLE`]. The value is fixed once the run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StageSkips {
    last_skipped: Option<Stage>,
}

impl StageSkips {
    /// Runs every stage.
    pub fn none() -> Self {
        Self::default()
    }

    /// Skips every stage up to and including `stage`.
    ///
    /// Stages past [`Stage::LAST_SKIPPABLE`] are clamped to it.
    pub fn through(stage: Stage) -> Self {
        Self {
            last_skipped: Some(stage.min(Stage::LAST_SKIPPABLE)),
        }
    }

    pub fn last_skipped(&self) -> Option<Stage> {
        self.last_skipped
    }

    pub fn is_skipped(&self, stage: Stage) -> bool {
        self.last_skipped.map_or(false, |last| stage <= last)
    }

    pub fn skipped(&self) -> impl Iterator<Item = Stage> + '_ {
        Stage::ALL.into_iter().filter(move |&stage| self.is_skipped(stage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn nothing_skipped_by_default() {
        let skips = StageSkips::none();
        assert!(Stage::ALL.iter().all(|&stage| !skips.is_skipped(stage)));
    }

    #[test_case(Stage::RotationAveraging, 4)]
    #[test_case(Stage::TrackEstablishment, 5)]
    #[test_case(Stage::BundleAdjustment, 7)]
    #[test_case(Stage::Pruning, 7)]
    fn skips_are_a_prefix(stage: Stage, count: usize) {
        let skips = StageSkips::through(stage);
        let skipped: Vec<Stage> = skips.skipped().collect();
        assert_eq!(skipped, Stage::ALL[..count]);
        assert!(!skips.is_skipped(Stage::Retriangulation));
        assert!(!skips.is_skipped(Stage::Pruning));
    }
}
