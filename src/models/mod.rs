//! Data model shared by the search pipeline and the HTTP layer.

pub mod backend;
pub mod gallery;
pub mod outcome;

pub use backend::{BackendKind, QueryContract, RawBackendResponse};
pub use gallery::{GalleryItem, ThumbnailGallery, MAX_RESULTS, MAX_SLIDES};
pub use outcome::{BackendDiagnostics, BackendStatus, MatchState, ResolvedMatch, SearchOutcome};
