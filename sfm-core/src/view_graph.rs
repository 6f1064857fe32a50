use crate::{ImageId, ImagePair, PairId};
use std::collections::HashMap;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// All pairwise two-view relationships between images.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct ViewGraph {
    image_pairs: HashMap<PairId, ImagePair>,
}

impl ViewGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a pair, returning the record it replaced, if any.
    pub fn insert(&mut self, pair: ImagePair) -> Option<ImagePair> {
        self.image_pairs.insert(pair.pair_id(), pair)
    }

    /// Looks up the pair between two images in either argument order.
    pub fn get(&self, a: ImageId, b: ImageId) -> Option<&ImagePair> {
        self.image_pairs.get(&PairId::from_images(a, b))
    }

    pub fn get_by_id(&self, pair_id: PairId) -> Option<&ImagePair> {
        self.image_pairs.get(&pair_id)
    }

    pub fn contains(&self, a: ImageId, b: ImageId) -> bool {
        self.image_pairs.contains_key(&PairId::from_images(a, b))
    }

    pub fn remove(&mut self, a: ImageId, b: ImageId) -> Option<ImagePair> {
        self.image_pairs.remove(&PairId::from_images(a, b))
    }

    /// Takes the pair out, runs `f` on it and stores the result in its place.
    ///
    /// Returns `false` if there is no such pair.
    pub fn replace_with(
        &mut self,
        a: ImageId,
        b: ImageId,
        f: impl FnOnce(ImagePair) -> ImagePair,
    ) -> bool {
        match self.remove(a, b) {
            Some(pair) => {
                self.insert(f(pair));
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (PairId, &ImagePair)> + '_ {
        self.image_pairs.iter().map(|(&id, pair)| (id, pair))
    }

    pub fn pairs(&self) -> impl Iterator<Item = &ImagePair> + '_ {
        self.image_pairs.values()
    }

    pub fn len(&self) -> usize {
        self.image_pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.image_pairs.is_empty()
    }

    pub fn num_valid_pairs(&self) -> usize {
        self.pairs().filter(|pair| pair.is_valid()).count()
    }

    pub fn clear(&mut self) {
        self.image_pairs.clear();
    }
}

impl FromIterator<ImagePair> for ViewGraph {
    fn from_iter<T: IntoIterator<Item = ImagePair>>(iter: T) -> Self {
        let mut view_graph = Self::new();
        for pair in iter {
            view_graph.insert(pair);
        }
        view_graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_symmetric() {
        let mut view_graph = ViewGraph::new();
        view_graph.insert(ImagePair::new(8, 3).unwrap().with_weight(0.25));
        let forward = view_graph.get(3, 8).unwrap();
        let backward = view_graph.get(8, 3).unwrap();
        assert!(std::ptr::eq(forward, backward));
        assert_eq!((forward.image_id1(), forward.image_id2()), (3, 8));
        assert_eq!(view_graph.len(), 1);
    }

    #[test]
    fn insert_replaces_whole_record() {
        let mut view_graph = ViewGraph::new();
        view_graph.insert(ImagePair::new(1, 2).unwrap().with_matches(vec![[0, 0]]));
        let old = view_graph.insert(ImagePair::new(2, 1).unwrap().with_validity(false));
        assert_eq!(old.unwrap().matches(), &[[0, 0]]);
        let pair = view_graph.get(1, 2).unwrap();
        assert!(!pair.is_valid());
        assert!(pair.matches().is_empty());
        assert_eq!(view_graph.num_valid_pairs(), 0);
    }

    #[test]
    fn replace_with_missing_pair() {
        let mut view_graph: ViewGraph = [ImagePair::new(1, 2).unwrap()].into_iter().collect();
        assert!(view_graph.replace_with(2, 1, |pair| pair.with_weight(3.0)));
        assert_eq!(view_graph.get(1, 2).unwrap().weight(), 3.0);
        assert!(!view_graph.replace_with(1, 3, |pair| pair));
        assert_eq!(view_graph.len(), 1);
    }
}
