use crate::{GraphError, ImageId};
use derive_more::{Display, From, Into};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// Image ids must stay below this value to be encoded in a [`PairId`].
pub const MAX_PAIR_IMAGE_ID: u64 = 2_147_483_647;

/// Order-independent key of an image pair.
///
/// The key is `MAX_PAIR_IMAGE_ID * min(a, b) + max(a, b)`, which is a bijection
/// for every pair of ids below [`MAX_PAIR_IMAGE_ID`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct PairId(pub u64);

impl PairId {
    /// Creates the key of a pair, canonicalizing the order of the pair.
    pub fn from_images(a: ImageId, b: ImageId) -> Self {
        let (a, b) = ordered(a, b);
        Self(MAX_PAIR_IMAGE_ID * u64::from(a) + u64::from(b))
    }

    /// Same as [`PairId::from_images`], but rejects ids the key cannot represent.
    pub fn try_from_images(a: ImageId, b: ImageId) -> Result<Self, GraphError> {
        for id in [a, b] {
            if u64::from(id) >= MAX_PAIR_IMAGE_ID {
                return Err(GraphError::ImageIdOutOfRange(id));
            }
        }
        if a == b {
            return Err(GraphError::SelfPair(a));
        }
        Ok(Self::from_images(a, b))
    }

    /// Recovers `(image_id1, image_id2)` with `image_id1 < image_id2`.
    pub fn to_images(self) -> (ImageId, ImageId) {
        let image_id2 = self.0 % MAX_PAIR_IMAGE_ID;
        let image_id1 = (self.0 - image_id2) / MAX_PAIR_IMAGE_ID;
        (image_id1 as ImageId, image_id2 as ImageId)
    }
}

pub(crate) fn ordered(a: ImageId, b: ImageId) -> (ImageId, ImageId) {
    (a.min(b), a.max(b))
}
