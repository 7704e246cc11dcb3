//! Database record models matching table schemas.
//!
//! These are the shapes the [`Storage`](super::Storage) implementations accept and return. They
//! are kept separate from the API models so the wire format and the schema can evolve
//! independently.
//!
//! - [`users`]: User accounts
//! - [`keys`]: API keys, including [`keys::KeyRecord`] which the key cache stores
//! - [`projects`]: Pushed project versions

pub mod keys;
pub mod projects;
pub mod users;
