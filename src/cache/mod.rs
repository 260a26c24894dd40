//! Mnemo cache subsystem.
//!
//! Caches the expensive user-facing aggregates (card documents, review
//! queues, quiz sets, progress overviews) and keeps them consistent by
//! resolving, per successful mutation, exactly which partitions went
//! stale.
//!
//! ## Configuration
//!
//! Cache behavior is controlled via `mnemo.toml`:
//!
//! ```toml
//! [cache]
//! enabled = true
//! aggregate_limit = 256
//! ```

mod config;
mod keys;
mod middleware;
mod plan;
mod resolver;
mod store;

pub use config::CacheConfig;
pub use keys::CacheKey;
pub use middleware::{CacheState, invalidate_on_write};
pub use plan::InvalidationPlan;
pub use resolver::{MutationRequest, SkipFlags, is_success};
pub use store::AggregateStore;
