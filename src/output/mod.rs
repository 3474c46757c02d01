// src/output/mod.rs
//! Output handling with clear separation of planning and execution.
//!
//! Jobs describe what to write as an [`OutputPlan`]; [`deliver`] performs
//! the I/O and reports per-operation outcomes.

mod paths;
mod types;
mod writer;

pub use paths::{sanitize_filename, DataLayout};
pub use types::{DeliveryTarget, OutputPlan, OutputReport};
pub use writer::{deliver, save_json, to_json_document};
