//! HTTP-facing food diary service
//!
//! The access service composes the credential store, session authority,
//! social graph and diary store; the router maps its results onto HTTP.

pub mod access;
pub mod config;
pub mod error;
pub mod extract;
pub mod nutrition;
pub mod routes;
pub mod state;

pub use access::{AccessService, AuthSession, Requester};
pub use state::AppState;
