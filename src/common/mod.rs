//! Common types, traits, and error definitions for ukf_sensor_fusion
//!
//! This module provides the foundational building blocks shared by the
//! filter, the evaluation helpers and the simulation harness.

pub mod angle;
pub mod types;
pub mod traits;
pub mod error;

pub use angle::normalize_angle;
pub use types::*;
pub use traits::*;
pub use error::*;
