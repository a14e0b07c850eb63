//! Synthetic host used by the binary and the benchmarks

pub mod world;

pub use world::{SimEntity, SimWorld, StepReport};
