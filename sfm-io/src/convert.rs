//! Conversion between the rig-aware [`Scene`] and the flat [`Snapshot`].
//!
//! A snapshot only knows posed images. Applied onto a scene that already holds
//! the rigs and frames, [`apply_snapshot`] puts the image poses back onto
//! their frames. Images the scene does not know come back as their own
//! single-camera rig and frame with `frame_id == image_id`.

use crate::snapshot::{Snapshot, SnapshotImage};
use log::*;
use sfm_core::nalgebra::Isometry3;
use sfm_core::{CameraId, Frame, FrameId, Image, ImageId, Rig, Scene, Track};
use std::collections::HashSet;

/// Builds the snapshot of the registered part of `scene`.
///
/// With `Some(cluster)` only frames of that cluster are included. Tracks keep
/// only their observations in included images and are dropped when none
/// remain; features of included images lose the reference to dropped tracks.
pub fn scene_to_snapshot(scene: &Scene, cluster: Option<i32>) -> Snapshot {
    let frames: HashSet<FrameId> = scene
        .frames
        .values()
        .filter(|frame| frame.is_registered())
        .filter(|frame| cluster.map_or(true, |cluster| frame.cluster_id == cluster))
        .map(|frame| frame.frame_id)
        .collect();

    let mut snapshot = Snapshot::new();
    for image in scene.images.values() {
        if !frames.contains(&image.frame_id) {
            continue;
        }
        let cam_from_world = match scene.cam_from_world(image.image_id) {
            Some(pose) => pose,
            None => {
                debug!(
                    "image {} has no known pose in its rig, leaving it out",
                    image.image_id
                );
                continue;
            }
        };
        snapshot.images.insert(
            image.image_id,
            SnapshotImage {
                image_id: image.image_id,
                camera_id: image.camera_id,
                name: image.name.clone(),
                cam_from_world,
                points2d: image.features.clone(),
            },
        );
    }

    for track in scene.tracks.values() {
        let observations: Vec<_> = track
            .observations
            .iter()
            .filter(|observation| snapshot.images.contains_key(&observation.image_id))
            .copied()
            .collect();
        if !observations.is_empty() {
            snapshot.points3d.insert(
                track.track_id,
                Track {
                    observations,
                    ..track.clone()
                },
            );
        }
    }

    for image in snapshot.images.values_mut() {
        for feature in &mut image.points2d {
            if feature
                .track_id
                .map_or(false, |id| !snapshot.points3d.contains_key(&id))
            {
                feature.track_id = None;
            }
        }
    }

    for camera_id in snapshot.images.values().map(|image| image.camera_id) {
        if let Some(camera) = scene.cameras.get(&camera_id) {
            snapshot.cameras.insert(camera_id, camera.clone());
        }
    }

    snapshot
}

/// Builds a scene from a snapshot. Every frame is registered and unclustered.
pub fn snapshot_to_scene(snapshot: &Snapshot) -> Scene {
    let mut scene = Scene::new();
    apply_snapshot(snapshot, &mut scene);
    scene
}

/// Replaces the reconstructed part of `scene` with the content of `snapshot`.
///
/// Rigs, frame membership, cluster ids and gravity of known frames are kept.
/// Every frame pose is reset and then derived from the pose of an image of
/// that frame in the snapshot, so frames without a snapshot image end up
/// unregistered. Cameras and features are taken from the snapshot and the
/// tracks are replaced by its points. Feature references to tracks that no
/// longer exist are cleared.
pub fn apply_snapshot(snapshot: &Snapshot, scene: &mut Scene) {
    for camera in snapshot.cameras.values() {
        scene.cameras.insert(camera.camera_id, camera.clone());
    }
    for frame in scene.frames.values_mut() {
        frame.rig_from_world = None;
    }

    let mut num_added = 0;
    for image in snapshot.images.values() {
        let frame_id = match scene.images.get_mut(&image.image_id) {
            Some(known) => {
                known.features = image.points2d.clone();
                known.frame_id
            }
            None => {
                add_single_camera_image(scene, image.image_id, image.camera_id, &image.name);
                if let Some(added) = scene.images.get_mut(&image.image_id) {
                    added.features = image.points2d.clone();
                }
                num_added += 1;
                image.image_id
            }
        };

        let sensor_from_rig = scene
            .frames
            .get(&frame_id)
            .and_then(|frame| scene.rigs.get(&frame.rig_id))
            .map_or_else(
                || Some(Isometry3::identity()),
                |rig| rig.sensor_from_rig(image.camera_id),
            );
        match (scene.frames.get_mut(&frame_id), sensor_from_rig) {
            (Some(frame), Some(sensor_from_rig)) if frame.rig_from_world.is_none() => {
                frame.rig_from_world = Some(sensor_from_rig.inverse() * image.cam_from_world);
            }
            (Some(_), Some(_)) => {}
            (Some(_), None) => debug!(
                "camera {} of image {} has no known pose in its rig, not posing frame {} from it",
                image.camera_id, image.image_id, frame_id
            ),
            (None, _) => warn!(
                "image {} refers to missing frame {}, leaving it unposed",
                image.image_id, frame_id
            ),
        }
    }
    if num_added > 0 {
        debug!("{} snapshot images were unknown and got their own frame", num_added);
    }

    scene.tracks = snapshot
        .points3d
        .iter()
        .map(|(&id, track)| (id, track.clone()))
        .collect();
    let tracks = &scene.tracks;
    for image in scene.images.values_mut() {
        for feature in &mut image.features {
            if feature.track_id.map_or(false, |id| !tracks.contains_key(&id)) {
                feature.track_id = None;
            }
        }
    }
}

fn add_single_camera_image(scene: &mut Scene, image_id: ImageId, camera_id: CameraId, name: &str) {
    scene
        .rigs
        .entry(camera_id)
        .or_insert_with(|| Rig::single(camera_id, camera_id));
    let frame = scene.frames.entry(image_id).or_insert_with(|| Frame::new(image_id, camera_id));
    frame.image_ids.push(image_id);
    scene
        .images
        .insert(image_id, Image::new(image_id, camera_id, image_id, name));
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sfm_core::nalgebra::{Isometry3, Point2, Point3, Translation3, UnitQuaternion};
    use sfm_core::{Camera, CameraModel, Feature, Observation, UNCLUSTERED};

    /// Two single-camera frames in clusters 0 and 1 plus an unregistered one,
    /// with one track seen by both registered images.
    fn scene() -> Scene {
        let mut scene = Scene::new();
        scene.cameras.insert(
            1,
            Camera {
                camera_id: 1,
                model: CameraModel::SimplePinhole,
                width: 100,
                height: 100,
                params: vec![80.0, 50.0, 50.0],
            },
        );
        scene.rigs.insert(1, Rig::single(1, 1));
        for (id, cluster, registered) in [(1u32, 0, true), (2, 1, true), (3, UNCLUSTERED, false)] {
            let mut frame = Frame::new(id, 1);
            frame.image_ids.push(id);
            frame.cluster_id = cluster;
            frame.rig_from_world = registered.then(|| {
                Isometry3::from_parts(
                    Translation3::new(f64::from(id), 0.0, 0.0),
                    UnitQuaternion::from_euler_angles(0.0, 0.1 * f64::from(id), 0.0),
                )
            });
            scene.frames.insert(id, frame);
            let mut image = Image::new(id, 1, id, format!("{}.png", id));
            image.features.push(Feature {
                xy: Point2::new(10.0, 20.0),
                track_id: Some(100),
            });
            scene.images.insert(id, image);
        }
        scene.tracks.insert(
            100,
            Track {
                track_id: 100,
                xyz: Point3::new(0.0, 0.0, 5.0),
                color: [0, 0, 0],
                error: -1.0,
                observations: (1..=3)
                    .map(|image_id| Observation {
                        image_id,
                        feature: 0,
                    })
                    .collect(),
            },
        );
        scene
    }

    #[test]
    fn unregistered_frames_are_left_out() {
        let snapshot = scene_to_snapshot(&scene(), None);
        assert_eq!(snapshot.images.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(snapshot.points3d[&100].observations.len(), 2);
        assert_eq!(snapshot.cameras.len(), 1);
    }

    #[test]
    fn cluster_filter() {
        let scene = scene();
        let snapshot = scene_to_snapshot(&scene, Some(1));
        assert_eq!(snapshot.images.len(), 1);
        assert_eq!(
            snapshot.points3d[&100].observations,
            vec![Observation {
                image_id: 2,
                feature: 0
            }]
        );

        let empty = scene_to_snapshot(&scene, Some(5));
        assert!(empty.is_empty());
    }

    #[test]
    fn tracks_without_observations_are_dropped() {
        let mut scene = scene();
        scene.frames.get_mut(&2).unwrap().cluster_id = 0;
        scene.tracks.get_mut(&100).unwrap().observations.retain(|o| o.image_id == 3);
        let snapshot = scene_to_snapshot(&scene, Some(0));
        assert!(snapshot.points3d.is_empty());
        assert!(snapshot
            .images
            .values()
            .all(|image| image.points2d.iter().all(|p| p.track_id.is_none())));
    }

    #[test]
    fn poses_survive_the_round_trip() {
        let scene = scene();
        let restored = snapshot_to_scene(&scene_to_snapshot(&scene, None));
        assert_eq!(restored.num_registered_frames(), 2);
        for id in [1, 2] {
            assert_relative_eq!(
                restored.cam_from_world(id).unwrap().to_homogeneous(),
                scene.cam_from_world(id).unwrap().to_homogeneous(),
                epsilon = 1e-12
            );
            assert_eq!(restored.frames[&id].cluster_id, UNCLUSTERED);
            assert_eq!(restored.images[&id].features, scene.images[&id].features);
        }
    }

    /// One frame with id 10 carried by a two-camera rig, images 1 and 2.
    fn rig_scene() -> Scene {
        let mut scene = scene();
        let second = Camera {
            camera_id: 2,
            ..scene.cameras[&1].clone()
        };
        scene.cameras.insert(2, second);
        let mut rig = Rig::single(7, 1);
        rig.sensors.insert(2, Some(Isometry3::translation(-0.2, 0.0, 0.0)));
        scene.rigs = [(7, rig)].into_iter().collect();
        let mut frame = Frame::new(10, 7);
        frame.image_ids = vec![1, 2];
        frame.cluster_id = 3;
        frame.gravity = Some(sfm_core::nalgebra::Vector3::new(0.0, 1.0, 0.0));
        frame.rig_from_world = Some(Isometry3::from_parts(
            Translation3::new(0.5, 1.0, -2.0),
            UnitQuaternion::from_euler_angles(0.2, 0.0, -0.1),
        ));
        scene.frames = [(10, frame)].into_iter().collect();
        scene.images.remove(&3);
        for id in [1, 2] {
            let image = scene.images.get_mut(&id).unwrap();
            image.frame_id = 10;
            image.camera_id = id;
        }
        scene.tracks.get_mut(&100).unwrap().observations.retain(|o| o.image_id != 3);
        scene
    }

    #[test]
    fn applied_snapshot_keeps_rig_frames() {
        let original = rig_scene();
        let snapshot = scene_to_snapshot(&original, None);
        assert_eq!(snapshot.images.len(), 2);

        let mut target = original.clone();
        target.frames.get_mut(&10).unwrap().rig_from_world = None;
        target.tracks.clear();
        apply_snapshot(&snapshot, &mut target);

        assert_eq!(target.frames.keys().copied().collect::<Vec<_>>(), vec![10]);
        assert_eq!(target.rigs, original.rigs);
        let frame = &target.frames[&10];
        assert_eq!(frame.cluster_id, 3);
        assert!(frame.gravity.is_some());
        assert_relative_eq!(
            frame.rig_from_world.unwrap().to_homogeneous(),
            original.frames[&10].rig_from_world.unwrap().to_homogeneous(),
            epsilon = 1e-12
        );
        for id in [1, 2] {
            assert_relative_eq!(
                target.cam_from_world(id).unwrap().to_homogeneous(),
                original.cam_from_world(id).unwrap().to_homogeneous(),
                epsilon = 1e-12
            );
        }
        assert_eq!(target.tracks, original.tracks);
    }

    #[test]
    fn frames_missing_from_snapshot_are_unregistered() {
        let mut scene = scene();
        let snapshot = scene_to_snapshot(&scene, Some(0));
        scene.tracks.clear();
        scene.frames.get_mut(&2).unwrap().cluster_id = 1;
        apply_snapshot(&snapshot, &mut scene);
        assert!(scene.frames[&1].is_registered());
        assert!(!scene.frames[&2].is_registered());
        assert_eq!(scene.frames[&2].cluster_id, 1);
        assert_eq!(scene.tracks[&100].observations.len(), 1);
        assert_eq!(scene.images[&2].features[0].track_id, Some(100));
    }
}
