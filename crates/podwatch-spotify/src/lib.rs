//! Spotify Web API client for podwatch.
//!
//! Implements [`podwatch_core::provider::ContentProvider`] on top of the
//! client-credentials flow: no user context, one application token shared by
//! every caller and refreshed single-flight before it expires.

mod client;
mod link;
mod model;
mod token;

pub mod error;

pub use client::{
  DEFAULT_API_BASE_URL, DEFAULT_TOKEN_URL, MAX_EPISODE_LIMIT, SpotifyClient, SpotifyConfig,
};
pub use error::{Error, Result};
pub use link::parse_show_ref;
pub use token::{AccessToken, TokenCache};
