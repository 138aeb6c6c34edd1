//! Credential store and session authority for the food diary service
//!
//! `UserRepository` owns user identities and their salted credential hashes.
//! `SessionAuthority` issues opaque bearer tokens and is the only component
//! that decides who is making a request.

pub mod models;
pub mod repositories;
pub mod session;
pub mod validation;

pub use models::{Session, User, UserSummary};
pub use repositories::UserRepository;
pub use session::{SessionAuthority, TOKEN_TTL_DAYS};
