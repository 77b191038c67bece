//! Domain types shared across the pipeline.

pub mod errors;
pub mod model;
