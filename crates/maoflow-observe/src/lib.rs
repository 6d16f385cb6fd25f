//! Logging and trace export setup shared by MaoFlow binaries.

pub mod tracing_setup;
