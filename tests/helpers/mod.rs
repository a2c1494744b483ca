//! Test helpers module
//!
//! In-memory store, recording messenger, scripted language model and a
//! `TestContext` that wires them into the real services.

#![allow(dead_code)]

pub mod memory_store;
pub mod mocks;
pub mod test_context;

pub use memory_store::*;
pub use mocks::*;
pub use test_context::*;
