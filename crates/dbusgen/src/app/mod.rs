//! Application layer orchestrating domain logic and infrastructure.

pub mod artifacts;
pub mod document;
pub mod generate;
pub mod pipeline;
pub mod session;
pub mod tree;
