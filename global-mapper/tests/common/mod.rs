//! A deterministic solver and a small scene for driving the pipeline in tests.

#![allow(dead_code)]

use global_mapper::{GlobalPositionerConstraint, GlobalSolver, MapperState, SolverError, Stage};
use sfm_core::nalgebra::{Isometry3, Point2, Point3, Translation3, UnitQuaternion, Vector3};
use sfm_core::{
    Camera, CameraModel, Feature, Frame, FrameId, Image, ImagePair, Observation, Rig, Scene,
    Track, ViewGraph,
};

pub const NUM_FRAMES: u32 = 4;

/// Records the stages it runs and fakes their results.
#[derive(Debug, Default)]
pub struct ScriptedSolver {
    pub calls: Vec<Stage>,
    pub fail_at: Option<Stage>,
    pub constraint: Option<GlobalPositionerConstraint>,
}

impl ScriptedSolver {
    pub fn failing_at(stage: Stage) -> Self {
        Self {
            fail_at: Some(stage),
            ..Self::default()
        }
    }

    fn enter(&mut self, stage: Stage) -> Result<(), SolverError> {
        self.calls.push(stage);
        if self.fail_at == Some(stage) {
            Err(SolverError::NotConverged(format!("scripted failure in {}", stage)))
        } else {
            Ok(())
        }
    }
}

/// Cluster assigned by pruning: the first half of the frames in 0, the rest in 2.
pub fn cluster_of(frame_id: FrameId) -> i32 {
    if frame_id <= NUM_FRAMES / 2 {
        0
    } else {
        2
    }
}

impl GlobalSolver for ScriptedSolver {
    fn preprocess(&mut self, _state: &mut MapperState) -> Result<(), SolverError> {
        self.enter(Stage::Preprocessing)
    }

    fn calibrate_view_graph(&mut self, _state: &mut MapperState) -> Result<(), SolverError> {
        self.enter(Stage::ViewGraphCalibration)
    }

    fn estimate_relative_poses(&mut self, state: &mut MapperState) -> Result<(), SolverError> {
        self.enter(Stage::RelativePoseEstimation)?;
        let ids: Vec<_> = state
            .view_graph
            .pairs()
            .map(|pair| (pair.image_id1(), pair.image_id2()))
            .collect();
        for (a, b) in ids {
            state
                .view_graph
                .replace_with(a, b, |pair| pair.with_weight(2.0));
        }
        Ok(())
    }

    fn average_rotations(&mut self, state: &mut MapperState) -> Result<(), SolverError> {
        self.enter(Stage::RotationAveraging)?;
        for frame in state.scene.frames.values_mut() {
            frame.gravity = Some(Vector3::new(0.0, -1.0, 0.0));
            frame.rig_from_world = Some(Isometry3::from_parts(
                Translation3::identity(),
                UnitQuaternion::from_euler_angles(0.0, 0.05 * f64::from(frame.frame_id), 0.0),
            ));
        }
        Ok(())
    }

    fn establish_tracks(&mut self, state: &mut MapperState) -> Result<(), SolverError> {
        self.enter(Stage::TrackEstablishment)?;
        let mut observations = vec![];
        for image in state.scene.images.values_mut() {
            image.features = vec![Feature {
                xy: Point2::new(5.0, 5.0),
                track_id: Some(1),
            }];
            observations.push(Observation {
                image_id: image.image_id,
                feature: 0,
            });
        }
        observations.sort_by_key(|o| o.image_id);
        state.scene.tracks.insert(
            1,
            Track {
                track_id: 1,
                xyz: Point3::origin(),
                color: [0, 0, 0],
                error: -1.0,
                observations,
            },
        );
        Ok(())
    }

    fn position_globally(
        &mut self,
        state: &mut MapperState,
        constraint: GlobalPositionerConstraint,
    ) -> Result<(), SolverError> {
        self.enter(Stage::GlobalPositioning)?;
        self.constraint = Some(constraint);
        for frame in state.scene.frames.values_mut() {
            let rotation = frame
                .rig_from_world
                .map_or_else(UnitQuaternion::identity, |pose| pose.rotation);
            frame.rig_from_world = Some(Isometry3::from_parts(
                Translation3::new(f64::from(frame.frame_id), 0.0, 0.0),
                rotation,
            ));
        }
        Ok(())
    }

    fn bundle_adjust(&mut self, state: &mut MapperState) -> Result<(), SolverError> {
        self.enter(Stage::BundleAdjustment)?;
        for track in state.scene.tracks.values_mut() {
            track.xyz = Point3::new(0.0, 0.0, 10.0);
            track.error = 0.25;
        }
        Ok(())
    }

    fn retriangulate(&mut self, _state: &mut MapperState) -> Result<(), SolverError> {
        self.enter(Stage::Retriangulation)
    }

    fn prune(&mut self, state: &mut MapperState) -> Result<(), SolverError> {
        self.enter(Stage::Pruning)?;
        for frame in state.scene.frames.values_mut() {
            frame.cluster_id = cluster_of(frame.frame_id);
        }
        Ok(())
    }
}

/// Single-camera frames with `frame_id == image_id`, every consecutive pair matched.
pub fn observations() -> (ViewGraph, Scene) {
    let mut scene = Scene::new();
    scene.cameras.insert(
        1,
        Camera {
            camera_id: 1,
            model: CameraModel::SimpleRadial,
            width: 32,
            height: 24,
            params: vec![30.0, 16.0, 12.0, 0.0],
        },
    );
    scene.rigs.insert(1, Rig::single(1, 1));
    for id in 1..=NUM_FRAMES {
        let mut frame = Frame::new(id, 1);
        frame.image_ids.push(id);
        scene.frames.insert(id, frame);
        scene
            .images
            .insert(id, Image::new(id, 1, id, format!("img_{}.png", id)));
    }
    let view_graph = (1..NUM_FRAMES)
        .map(|id| {
            ImagePair::new(id, id + 1)
                .unwrap()
                .with_matches(vec![[0, 0]])
                .with_inliers(vec![0])
        })
        .collect();
    (view_graph, scene)
}

/// Moves every frame to id `frame_id + offset`, keeping its images.
pub fn offset_frame_ids(scene: &mut Scene, offset: FrameId) {
    scene.frames = std::mem::take(&mut scene.frames)
        .into_iter()
        .map(|(id, mut frame)| {
            frame.frame_id = id + offset;
            (id + offset, frame)
        })
        .collect();
    for image in scene.images.values_mut() {
        image.frame_id += offset;
    }
}
