//! Row-level security integration.
//!
//! Authorization filters are computed elsewhere and consumed opaquely; this
//! module only decides how they combine with caller-supplied filters.

mod merge;

pub use merge::{find_conflicts, merge_auth_filter, FilterConflict};
