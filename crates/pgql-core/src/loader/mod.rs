//! Batch entity loader.
//!
//! Coalesces the single-key lookups of one execution into grouped
//! multi-key statements, deduplicating identical requests.
//!
//! # Components
//!
//! - [`BatchLoader`] - Request registration, batch window and flush
//! - [`FifoCache`] - Bounded insertion-order result cache
//! - [`LoaderStats`] - Request, dedup and batch counters

mod batch;
mod fifo;
mod key;
mod stats;

pub use batch::BatchLoader;
pub use fifo::FifoCache;
pub use key::{EntityKey, GroupKey, LoadRequest};
pub use stats::{LoaderStats, LoaderStatsSnapshot};
