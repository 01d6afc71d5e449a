//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - measure time series (`MeasureSeries`, `DataPoint`, `Provenance`)
//! - consensus outputs (`ConsensusResult`, `MeasureContribution`)
//! - data-quality outputs (`ValidationResult`, `HealthReport`)
//! - recovery inputs/outputs (`RecoveryContext`, `RecoveryResult`)

pub mod types;

pub use types::*;
