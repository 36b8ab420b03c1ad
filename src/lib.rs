//! Blog Digest - A recent-posts aggregator for a fixed catalog of blogs
//!
//! This crate fetches the feeds of a categorized catalog, keeps the entries
//! published within a day window, and serves them grouped by category
//! through a small JSON API.

pub mod catalog;
pub mod config;
pub mod fetcher;
pub mod pipeline;
pub mod routes;
pub mod session;
