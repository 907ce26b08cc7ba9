//! Test utilities shared by the rankdb crates.
//!
//! - [`VecBackend`]: a minimal in-memory backend without input validation
//! - [`data_gen`]: seeded record generators and small constructors
//! - [`ranking`]: checks that bound pruning never changes a ranking
//!
//! This crate is only meant to be a dev-dependency.

pub mod backend;
pub mod data_gen;
pub mod ranking;

pub use backend::VecBackend;
pub use data_gen::{drain, record};
