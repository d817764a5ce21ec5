//! Pure domain layer for the vega auth core.
//!
//! This crate has no storage or I/O dependencies. It defines the shared
//! type aliases, the closed error taxonomy, the injectable clock, and the
//! input-shape validators used by registration and profile updates.

pub mod clock;
pub mod error;
pub mod types;
pub mod validation;
