//! Shared types for the datacat workspace.
//!
//! [`Record`] is the unit of data that flows between stages,
//! [`StageError`] is the runtime failure a stage reports, and
//! [`StageLabel`] names a stage instance in logs and diagnostics.

pub mod error;
pub mod record;
pub mod stage;

pub use error::StageError;
pub use record::{Record, Value};
pub use stage::{StageLabel, StageRole};
