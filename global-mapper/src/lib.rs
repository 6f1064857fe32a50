//! # Global Mapper
//!
//! Drives a global structure-from-motion pipeline over a [`MapperState`]:
//! rotation averaging, track establishment, global positioning and bundle
//! adjustment, followed by retriangulation and pruning into clusters.
//!
//! The numerical work of each stage is delegated to a [`GlobalSolver`]. This
//! crate owns the order of the stages, resumption from checkpoints written by
//! an earlier run and the export of the finished reconstruction.
//!
//! A run started with [`run_mapper`] searches the output directory for the most
//! advanced valid checkpoint, restores it and skips every stage it covers.

mod checkpoint;
mod controller;
mod error;
mod mapper;
mod observation;
mod settings;
mod solver;
mod stage;

pub use checkpoint::*;
pub use controller::*;
pub use error::*;
pub use mapper::*;
pub use observation::*;
pub use settings::*;
pub use solver::*;
pub use stage::*;
