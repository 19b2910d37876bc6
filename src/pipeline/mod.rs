pub mod cache;
pub mod dispatch;
pub mod grid;
pub mod matching;
pub mod normalize;
pub mod orchestrator;
pub mod upload;
pub mod vision;

pub use orchestrator::{Pipeline, ReferenceImage, SearchRequest};

use thiserror::Error;

use upload::UploadError;
use vision::VisionError;

/// Failures that end a search request. Everything else degrades in place.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("product description failed: {0}")]
    Description(VisionError),

    #[error("arbitration call failed: {0}")]
    Arbitration(VisionError),

    #[error("reference image upload failed: {0}")]
    Upload(UploadError),

    #[error("no search query could be derived from the image")]
    EmptyQuery,

    #[error("search timed out after {0}s")]
    Timeout(u64),
}
