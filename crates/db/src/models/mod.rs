//! Row models and per-operation DTOs.

pub mod session;
pub mod user;
