use sfm_core::nalgebra::{Isometry3, Matrix3, Translation3, UnitQuaternion, Vector3};
use sfm_core::{Frame, FrameId, ImagePair, TwoViewConfig, TwoViewGeometry, ViewGraph, UNCLUSTERED};
use sfm_io::{read_aux_state, write_aux_state, write_aux_state_with, AuxFormat, CodecError};
use std::collections::HashMap;
use test_case::test_case;

fn view_graph() -> ViewGraph {
    let geometry = |seed: f64| TwoViewGeometry {
        config: TwoViewConfig::Calibrated,
        essential: Matrix3::new(0.0, -seed, 0.2, seed, 0.0, -0.7, -0.2, 0.7, 0.0),
        fundamental: Matrix3::from_fn(|r, c| seed * (r as f64) - c as f64),
        homography: Matrix3::identity(),
        cam2_from_cam1: Isometry3::from_parts(
            Translation3::new(seed, 0.0, 1.0),
            UnitQuaternion::from_euler_angles(0.01, seed, -0.02),
        ),
    };
    [
        // No matches and no inliers.
        ImagePair::new(1, 2).unwrap().with_geometry(geometry(0.1)),
        // Matches without inliers.
        ImagePair::new(3, 2)
            .unwrap()
            .with_geometry(geometry(0.2))
            .with_matches(vec![[0, 5], [1, 6], [2, 9]])
            .with_weight(3.5),
        // Matches and inliers, marked invalid.
        ImagePair::new(4, 1)
            .unwrap()
            .with_geometry(TwoViewGeometry {
                config: TwoViewConfig::Planar,
                ..geometry(0.3)
            })
            .with_matches(vec![[7, 7], [8, 1]])
            .with_inliers(vec![1])
            .with_validity(false),
        // Inliers without matches.
        ImagePair::new(5, 6).unwrap().with_inliers(vec![0, 3, 4]),
    ]
    .into_iter()
    .collect()
}

fn frames() -> HashMap<FrameId, Frame> {
    (1..=6)
        .map(|id| {
            let mut frame = Frame::new(id, 1);
            if id % 2 == 0 {
                frame.gravity = Some(Vector3::new(0.0, f64::from(id), -1.0).normalize());
            }
            frame.cluster_id = id as i32 % 3 - 1;
            (id, frame)
        })
        .collect()
}

fn blank_frames() -> HashMap<FrameId, Frame> {
    (1..=6).map(|id| (id, Frame::new(id, 1))).collect()
}

#[test_case(AuxFormat::Legacy)]
#[test_case(AuxFormat::Versioned)]
fn round_trip_is_exact(format: AuxFormat) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(sfm_io::AUX_STATE_FILE);
    write_aux_state_with(&path, &view_graph(), &frames(), format).unwrap();

    let mut decoded = ViewGraph::new();
    let mut restored = blank_frames();
    let summary = read_aux_state(&path, &mut decoded, &mut restored).unwrap();
    assert_eq!(summary.format, format);
    assert_eq!(summary.num_pairs, 4);
    assert!(summary.has_frame_section);
    assert_eq!(summary.num_frames_updated, 6);

    assert_eq!(decoded, view_graph());
    assert_eq!(restored, frames());
    assert_eq!(decoded.get(2, 3), decoded.get(3, 2));
    assert_eq!(decoded.get(3, 2).unwrap().matches(), &[[0, 5], [1, 6], [2, 9]]);
}

#[test]
fn legacy_artifact_without_frames_leaves_frames_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(sfm_io::AUX_STATE_FILE);
    write_aux_state(&path, &view_graph(), &HashMap::new()).unwrap();

    // Drop the trailing empty frame section to get the older layout.
    let bytes = std::fs::read(&path).unwrap();
    std::fs::write(&path, &bytes[..bytes.len() - 8]).unwrap();

    let mut decoded = ViewGraph::new();
    let mut restored = frames();
    let summary = read_aux_state(&path, &mut decoded, &mut restored).unwrap();
    assert!(!summary.has_frame_section);
    assert_eq!(summary.num_frames_updated, 0);
    assert_eq!(decoded, view_graph());
    assert_eq!(restored, frames());
}

#[test]
fn truncated_pair_section_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(sfm_io::AUX_STATE_FILE);
    write_aux_state(&path, &view_graph(), &frames()).unwrap();
    let bytes = std::fs::read(&path).unwrap();
    std::fs::write(&path, &bytes[..100]).unwrap();

    let mut decoded = view_graph();
    let mut restored = blank_frames();
    let err = read_aux_state(&path, &mut decoded, &mut restored).unwrap_err();
    assert!(matches!(err, CodecError::Truncated("pairs")), "{:?}", err);
    assert_eq!(decoded, view_graph());
    assert!(restored.values().all(|frame| frame.cluster_id == UNCLUSTERED));
}
