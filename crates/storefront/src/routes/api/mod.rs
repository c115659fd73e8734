//! JSON API routes.

pub mod webauthn;
