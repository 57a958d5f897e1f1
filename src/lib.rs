#![doc = include_str!("../README.md")]

pub mod backup;
pub mod error;
pub mod fs;
mod ops;
pub mod txn;

pub use error::*;
pub use fs::FileManager;
pub use txn::{Enlistment, EnlistmentState, Participant, Registry, TransactionId};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
