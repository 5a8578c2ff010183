use thiserror::Error;

use crate::models::Platform;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StudioError {
    #[error("Describe the video you want to generate")]
    EmptyPrompt,

    #[error("Select at least one platform")]
    NoPlatformsSelected,

    #[error("{0} is not connected")]
    PlatformNotConnected(Platform),

    #[error("Post not found: {0}")]
    PostNotFound(String),
}
