//! Integration tests for the incremental rewrite pipeline.
//!
//! Run with: `cargo test --test integration`

mod rewrite_incremental;
mod rewrite_pipeline;
mod rewrite_prune;
