//! Terminal client for the capsule server.
//!
//! The client asks the evaluator what the viewer may do before sending
//! anything, so a doomed request (opening a sealed capsule, deleting an
//! opened one) never leaves the machine.

pub mod actions;
pub mod session;
pub mod store;
pub mod view;
