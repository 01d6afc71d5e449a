//! `inflation-measures` library crate.
//!
//! Loads several weighted inflation indices per currency, blends them into a
//! consensus adjustment, scores data quality, and degrades through layered
//! fallbacks (retry, legacy data, interpolation, estimation) when data is bad.
//!
//! The binary (`infl`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - a UI can call the same four boundary operations on `MeasurePipeline`

pub mod app;
pub mod cli;
pub mod clock;
pub mod config;
pub mod consensus;
pub mod data;
pub mod domain;
pub mod error;
pub mod quality;
pub mod recovery;
pub mod report;

pub use app::pipeline::{LoadOutcome, MeasurePipeline, PipelineOptions};
