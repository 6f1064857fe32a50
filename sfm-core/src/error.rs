use crate::ImageId;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("image {0} cannot be paired with itself")]
    SelfPair(ImageId),
    #[error("image id {0} exceeds the maximum id usable in a pair key")]
    ImageIdOutOfRange(ImageId),
}
