//! The auth/session/token core.
//!
//! [`service::AuthService`] is the orchestrator other subsystems call; it
//! composes the password hasher ([`password`]), the token issuer/verifier
//! ([`jwt`]), and the session policy engine ([`session::SessionManager`])
//! over injected [`vega_db::store`] seams and a [`vega_core::clock::Clock`].
//! The request-handling layer stays outside: every operation here returns
//! a plain result or a [`vega_core::error::AuthError`] kind.

pub mod background;
pub mod config;
pub mod cookie;
pub mod jwt;
pub mod password;
pub mod service;
pub mod session;
