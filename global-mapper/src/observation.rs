use crate::MapperState;
use log::*;
use sfm_core::{Scene, ViewGraph};
use std::collections::HashSet;
use std::convert::Infallible;
use std::error::Error;

/// Supplies the pairwise observations a run starts from.
pub trait ObservationSource {
    type Error: Error + Send + Sync + 'static;

    /// Loads the view graph and the entity mappings.
    ///
    /// With an allow-list, images whose names are not listed should be left out.
    fn load(&mut self, image_names: Option<&HashSet<String>>) -> Result<MapperState, Self::Error>;
}

/// Observations that are already in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    pub view_graph: ViewGraph,
    pub scene: Scene,
}

impl InMemorySource {
    pub fn new(view_graph: ViewGraph, scene: Scene) -> Self {
        Self { view_graph, scene }
    }
}

impl ObservationSource for InMemorySource {
    type Error = Infallible;

    fn load(&mut self, image_names: Option<&HashSet<String>>) -> Result<MapperState, Infallible> {
        let mut state = MapperState::new(self.view_graph.clone(), self.scene.clone());
        if let Some(names) = image_names {
            let before = state.scene.images.len();
            state.scene.images.retain(|_, image| names.contains(&image.name));
            let images = &state.scene.images;
            for frame in state.scene.frames.values_mut() {
                frame.image_ids.retain(|id| images.contains_key(id));
            }
            let pairs: Vec<_> = state
                .view_graph
                .pairs()
                .filter(|pair| {
                    !images.contains_key(&pair.image_id1()) || !images.contains_key(&pair.image_id2())
                })
                .map(|pair| (pair.image_id1(), pair.image_id2()))
                .collect();
            for (a, b) in pairs {
                state.view_graph.remove(a, b);
            }
            info!(
                "kept {} of {} images named in the image list",
                state.scene.images.len(),
                before
            );
        }
        Ok(state)
    }
}
