//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! Everything lives under `/users`:
//!
//! - **Users** (`/users`, `/users/{username}`): account management, master credential only
//! - **Keys** (`/users/{username}/keys/*`): key issuance and management, master credential only
//! - **Projects** (`/users/{username}/projects/*`): anonymous reads, key-authorized pushes
//!
//! # OpenAPI Documentation
//!
//! All endpoints are documented with `utoipa` annotations. The rendered reference is served at
//! `/docs` when the server is running.

pub mod handlers;
pub mod models;
