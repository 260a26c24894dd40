//! Mnemo: a flashcard study API with write-path cache invalidation.
//!
//! The HTTP surface serves cards, review queues, quiz sets, and progress
//! overviews. Expensive aggregates are cached; the cache subsystem watches
//! every successful mutation and drops exactly the aggregates it made
//! stale.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
