//! Compensating file-system operations.
//!
//! Each mutation kind knows how to capture the state it needs before running,
//! and how to undo itself if the owning transaction aborts.

mod operation;

pub(crate) use operation::Operation;
