//! Utility modules for common functionality

pub mod signal;

pub use signal::install_cancel_handler;

// vim: ts=4
