//! Core types and trait definitions for podwatch.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! The store, catalog and messaging adapters all depend on it, and the
//! reconciliation engine is written purely against the traits defined here.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod diff;
pub mod episode;
pub mod error;
pub mod notify;
pub mod provider;
pub mod show;
pub mod store;

pub use error::{Error, Result};
