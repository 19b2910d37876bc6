//! Match Resolver: arbitration plus per-backend index resolution.

pub mod arbitration;
pub mod links;
pub mod resolver;

pub use arbitration::{parse_arbitration, ArbitrationParseError, MatchIndices};
pub use links::{build_link, DEFAULT_MARKETPLACE_ORIGIN};
pub use resolver::{BackendResolution, MatchResolver, Resolution};
