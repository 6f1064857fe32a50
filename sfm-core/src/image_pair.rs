use crate::{GraphError, ImageId, PairId, TwoViewConfig, TwoViewGeometry};
use nalgebra::{Isometry3, Matrix3};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// The pairwise relationship between two images of the view graph.
///
/// Fields can only be read. To change a pair, build a new value with the
/// consuming `with_*` methods and insert it into the [`ViewGraph`](crate::ViewGraph),
/// replacing the old record.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct ImagePair {
    image_id1: ImageId,
    image_id2: ImageId,
    is_valid: bool,
    weight: f64,
    geometry: TwoViewGeometry,
    matches: Vec<[i32; 2]>,
    inliers: Vec<i32>,
}

impl ImagePair {
    /// Creates a valid pair with undefined geometry and no matches.
    ///
    /// The ids are stored in ascending order regardless of argument order.
    pub fn new(a: ImageId, b: ImageId) -> Result<Self, GraphError> {
        PairId::try_from_images(a, b)?;
        let (image_id1, image_id2) = crate::pair::ordered(a, b);
        Ok(Self {
            image_id1,
            image_id2,
            is_valid: true,
            weight: 1.0,
            geometry: TwoViewGeometry::default(),
            matches: Vec::new(),
            inliers: Vec::new(),
        })
    }

    pub fn pair_id(&self) -> PairId {
        PairId::from_images(self.image_id1, self.image_id2)
    }

    pub fn image_id1(&self) -> ImageId {
        self.image_id1
    }

    pub fn image_id2(&self) -> ImageId {
        self.image_id2
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn config(&self) -> TwoViewConfig {
        self.geometry.config
    }

    pub fn geometry(&self) -> &TwoViewGeometry {
        &self.geometry
    }

    pub fn essential(&self) -> &Matrix3<f64> {
        &self.geometry.essential
    }

    pub fn fundamental(&self) -> &Matrix3<f64> {
        &self.geometry.fundamental
    }

    pub fn homography(&self) -> &Matrix3<f64> {
        &self.geometry.homography
    }

    pub fn cam2_from_cam1(&self) -> &Isometry3<f64> {
        &self.geometry.cam2_from_cam1
    }

    /// Feature index pairs `[feature in image 1, feature in image 2]`.
    pub fn matches(&self) -> &[[i32; 2]] {
        &self.matches
    }

    /// Indices into [`ImagePair::matches`].
    pub fn inliers(&self) -> &[i32] {
        &self.inliers
    }

    /// Replaces the geometry, which must be expressed from `image_id1` to `image_id2`.
    #[must_use]
    pub fn with_geometry(self, geometry: TwoViewGeometry) -> Self {
        Self { geometry, ..self }
    }

    #[must_use]
    pub fn with_validity(self, is_valid: bool) -> Self {
        Self { is_valid, ..self }
    }

    #[must_use]
    pub fn with_weight(self, weight: f64) -> Self {
        Self { weight, ..self }
    }

    #[must_use]
    pub fn with_matches(self, matches: Vec<[i32; 2]>) -> Self {
        Self { matches, ..self }
    }

    #[must_use]
    pub fn with_inliers(self, inliers: Vec<i32>) -> Self {
        Self { inliers, ..self }
    }

    /// Iterates the matches selected by the inlier list, skipping indices out of range.
    pub fn inlier_matches(&self) -> impl Iterator<Item = [i32; 2]> + '_ {
        self.inliers.iter().filter_map(move |&ix| {
            usize::try_from(ix)
                .ok()
                .and_then(|ix| self.matches.get(ix).copied())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_ordered() {
        let pair = ImagePair::new(9, 4).unwrap();
        assert_eq!((pair.image_id1(), pair.image_id2()), (4, 9));
        assert_eq!(pair.pair_id(), PairId::from_images(4, 9));
    }

    #[test]
    fn self_pair_is_rejected() {
        assert_eq!(ImagePair::new(2, 2), Err(GraphError::SelfPair(2)));
    }

    #[test]
    fn inlier_matches_skip_out_of_range() {
        let pair = ImagePair::new(0, 1)
            .unwrap()
            .with_matches(vec![[0, 3], [1, 5], [2, 7]])
            .with_inliers(vec![2, -1, 0, 10]);
        let inliers: Vec<_> = pair.inlier_matches().collect();
        assert_eq!(inliers, vec![[2, 7], [0, 3]]);
    }
}
