//! metaharvest - document discovery and metadata harvesting.
//!
//! Finds documents a domain has published through a web search engine,
//! downloads them, and mines their embedded metadata for usernames,
//! software versions, email addresses and internal paths.

pub mod config;
pub mod download;
pub mod export;
pub mod extractors;
pub mod http;
pub mod models;
pub mod pipeline;
pub mod processing;
pub mod search;
pub mod text;
