//! The library code for the `skald` blog front-end. Posts live on a static
//! host as numbered documents (`posts/1.json`, `posts/2.json`, ...) with no
//! directory listing, so the architecture breaks down into three steps:
//!
//! 1. Discovering which posts exist ([`crate::discover`]): IDs are fetched in
//!    fixed-size batches of concurrent requests until a batch contains a 404.
//! 2. Fetching and rendering each post's Markdown content ([`crate::blog`],
//!    [`crate::markdown`]).
//! 3. Templating the posts into index and post pages on disk
//!    ([`crate::write`]).
//!
//! The first step is the only one with interesting behaviour. A 404 is the
//! end-of-collection signal, while any other failure is by default dropped
//! from the result without ending discovery. See [`crate::discover`] for the
//! knobs that make either rule stricter.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod blog;
pub mod build;
pub mod cli;
pub mod config;
pub mod discover;
pub mod fetch;
pub mod id;
pub mod markdown;
pub mod path;
pub mod post;
pub mod write;
