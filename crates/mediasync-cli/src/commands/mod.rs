//! Command implementations for the mediasync CLI.

pub mod cache;
pub mod sync;
