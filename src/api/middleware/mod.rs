//! API middleware.
//!
//! Only the search route is rate limited; health stays open.

pub mod rate;
