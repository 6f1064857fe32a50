//! # SfM Core
//!
//! Entity types shared by every crate of the global mapper: rigs, cameras,
//! frames, images and tracks, plus the [`ViewGraph`] of pairwise two-view
//! geometry that the global pipeline is built on.
//!
//! All entities are keyed by unsigned integer ids that are unique within
//! their own mapping. A [`Scene`] bundles the five entity mappings so they can
//! be handed around as a unit.
//!
//! Image pairs are keyed by a [`PairId`] which is derived from the two image
//! ids in an order-independent way:
//!
//! ```
//! use sfm_core::PairId;
//!
//! assert_eq!(PairId::from_images(3, 7), PairId::from_images(7, 3));
//! assert_eq!(PairId::from_images(7, 3).to_images(), (3, 7));
//! ```
//!
//! An [`ImagePair`] can only be changed by replacing it as a whole, which keeps
//! the matrices and the relative pose consistent with its [`TwoViewConfig`].

mod camera;
mod error;
mod frame;
mod image;
mod image_pair;
mod pair;
mod rig;
mod scene;
mod track;
mod two_view;
mod view_graph;

pub use camera::*;
pub use error::*;
pub use frame::*;
pub use image::*;
pub use image_pair::*;
pub use nalgebra;
pub use pair::*;
pub use rig::*;
pub use scene::*;
pub use track::*;
pub use two_view::*;
pub use view_graph::*;

pub type RigId = u32;
pub type CameraId = u32;
pub type FrameId = u32;
pub type ImageId = u32;
pub type TrackId = u64;

/// Cluster id of a frame that has not been assigned to any component.
pub const UNCLUSTERED: i32 = -1;
