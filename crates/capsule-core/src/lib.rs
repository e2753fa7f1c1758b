//! Capsule visibility and unlock rules.
//!
//! Everything here is a pure function of its inputs: a capsule record, the
//! current time and the viewer. Callers (the HTTP layer, the terminal client)
//! fetch records, ask the evaluator what the viewer may do, and render or act
//! on the answer.

pub mod error;
pub mod evaluator;
pub mod format;
pub mod policy;

pub use error::CapsuleError;
pub use evaluator::{CapsuleRecord, Classification, Feed, Status, classify};
