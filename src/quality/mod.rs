//! Data-quality checks.
//!
//! - per-series validation with a 0..100 score (`validator`)
//! - per-currency roll-up with recommendations (`health`)

pub mod health;
pub mod validator;

pub use health::*;
pub use validator::*;
