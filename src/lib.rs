//! Admin Dashboard Normalization Library
//!
//! This library turns loosely-typed backend records (organizations, leads, usage
//! summaries) into canonical view models and derives aggregate statistics from them,
//! plus the thin HTTP service that exposes the pipeline.
//!
//! # Modules
//!
//! - `aggregate`: Distributions and top-N rankings.
//! - `config`: Configuration management.
//! - `date_range`: Inclusive date-range filtering.
//! - `errors`: Error handling types.
//! - `field_guard`: Type-checked field extraction with fallback chains.
//! - `handlers`: HTTP request handlers and router.
//! - `models`: View models and request payloads.
//! - `normalizer`: Rule-driven record normalization.
//! - `schema`: Field rule tables per entity kind.
//! - `timestamps`: Timestamp parsing and display formatting.

pub mod aggregate;
pub mod config;
pub mod date_range;
pub mod errors;
pub mod field_guard;
pub mod handlers;
pub mod models;
pub mod normalizer;
pub mod schema;
pub mod timestamps;
