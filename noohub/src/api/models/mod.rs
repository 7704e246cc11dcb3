//! Request and response bodies for the HTTP API.

pub mod keys;
pub mod projects;
pub mod users;
