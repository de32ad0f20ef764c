//! Shared helpers and in-memory backends used across unit tests.
mod common;
mod memory;

pub use common::*;
pub use memory::*;
