//! Infrastructure adapters for the bus and configuration.

pub mod bus;
pub mod config;
