//! Core types, fit-decision engine and service wiring for the EcoFit waste assistant.

/// Disposal guidance derived from a classification and fit verdict.
pub mod advice;
/// Volume comparison with a tolerance band.
pub mod fit;
/// Domain models shared by all adapters.
pub mod model;
/// Registry for selecting a classifier backend by id.
pub mod plugin;
/// Traits describing the external capabilities.
pub mod ports;
/// High-level service facade used by the HTTP layer.
pub mod service;
/// Bin volume estimation from sensor distances and fixed thresholds.
pub mod volume;

pub use advice::*;
pub use fit::*;
pub use model::*;
pub use plugin::*;
pub use ports::*;
pub use service::*;
pub use volume::*;
