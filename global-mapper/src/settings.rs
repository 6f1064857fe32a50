use crate::MapperError;
use log::*;
use serde::{Deserialize, Serialize};
use sfm_io::{AuxFormat, SnapshotFormat};
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use std::str::FromStr;

/// Which constraints the global positioner optimizes over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GlobalPositionerConstraint {
    #[default]
    OnlyPoints,
    OnlyCameras,
    PointsAndCamerasBalanced,
    PointsAndCameras,
}

impl GlobalPositionerConstraint {
    pub const ALL: [GlobalPositionerConstraint; 4] = [
        GlobalPositionerConstraint::OnlyPoints,
        GlobalPositionerConstraint::OnlyCameras,
        GlobalPositionerConstraint::PointsAndCamerasBalanced,
        GlobalPositionerConstraint::PointsAndCameras,
    ];

    pub fn name(self) -> &'static str {
        match self {
            GlobalPositionerConstraint::OnlyPoints => "ONLY_POINTS",
            GlobalPositionerConstraint::OnlyCameras => "ONLY_CAMERAS",
            GlobalPositionerConstraint::PointsAndCamerasBalanced => "POINTS_AND_CAMERAS_BALANCED",
            GlobalPositionerConstraint::PointsAndCameras => "POINTS_AND_CAMERAS",
        }
    }
}

impl fmt::Display for GlobalPositionerConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GlobalPositionerConstraint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|constraint| constraint.name() == s)
            .ok_or_else(|| format!("invalid constraint type {:?}", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapperSettings {
    /// Write a checkpoint after each checkpointable stage completes
    #[serde(default = "default_checkpointing")]
    pub checkpointing: bool,
    /// Encoding of the snapshot inside checkpoints
    #[serde(default = "default_checkpoint_format")]
    pub checkpoint_format: SnapshotFormat,
    /// Form of the auxiliary state written into checkpoints
    #[serde(default = "default_aux_format")]
    pub aux_format: AuxFormat,
    /// Constraints used during global positioning
    #[serde(default = "default_constraint_type")]
    pub constraint_type: GlobalPositionerConstraint,
}

impl Default for MapperSettings {
    fn default() -> Self {
        Self {
            checkpointing: default_checkpointing(),
            checkpoint_format: default_checkpoint_format(),
            aux_format: default_aux_format(),
            constraint_type: default_constraint_type(),
        }
    }
}

impl MapperSettings {
    /// Loads settings from a JSON file.
    ///
    /// A file that does not exist gives the defaults; one that cannot be
    /// parsed is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MapperError> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("no settings at {}, used default settings", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(MapperError::SettingsIo {
                    path: path.to_owned(),
                    source,
                })
            }
        };
        let settings = serde_json::from_reader(BufReader::new(file)).map_err(|source| {
            MapperError::Settings {
                path: path.to_owned(),
                source,
            }
        })?;
        info!("loaded settings from {}", path.display());
        Ok(settings)
    }
}

fn default_checkpointing() -> bool {
    true
}

fn default_checkpoint_format() -> SnapshotFormat {
    SnapshotFormat::Binary
}

fn default_aux_format() -> AuxFormat {
    AuxFormat::Legacy
}

fn default_constraint_type() -> GlobalPositionerConstraint {
    GlobalPositionerConstraint::OnlyPoints
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let settings: MapperSettings =
            serde_json::from_str(r#"{ "constraint_type": "POINTS_AND_CAMERAS_BALANCED" }"#).unwrap();
        assert_eq!(
            settings,
            MapperSettings {
                constraint_type: GlobalPositionerConstraint::PointsAndCamerasBalanced,
                ..MapperSettings::default()
            }
        );
    }

    #[test]
    fn formats_use_their_selectors() {
        let settings: MapperSettings = serde_json::from_str(
            r#"{ "checkpointing": false, "checkpoint_format": "txt", "aux_format": "versioned" }"#,
        )
        .unwrap();
        assert!(!settings.checkpointing);
        assert_eq!(settings.checkpoint_format, SnapshotFormat::Text);
        assert_eq!(settings.aux_format, AuxFormat::Versioned);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapper-settings.json");
        assert_eq!(MapperSettings::load(&path).unwrap(), MapperSettings::default());

        std::fs::write(&path, r#"{ "checkpointing": "yes" }"#).unwrap();
        assert!(matches!(
            MapperSettings::load(&path),
            Err(MapperError::Settings { .. })
        ));
    }

    #[test]
    fn constraint_names() {
        for constraint in GlobalPositionerConstraint::ALL {
            assert_eq!(constraint.name().parse::<GlobalPositionerConstraint>().unwrap(), constraint);
        }
        assert!("ONLY_LINES".parse::<GlobalPositionerConstraint>().is_err());
    }
}
