//! API Module
//!
//! HTTP handlers and routing for the storage REST API.
//!
//! # Endpoints
//! - `PUT /items/:key` - Store a value
//! - `GET /items/:key` - Retrieve a value
//! - `PATCH /items/:key` - Replace a value, keeping its TTL policy
//! - `DELETE /items/:key` - Remove a value
//! - `DELETE /items` - Clear the namespace
//! - `GET /keys` - List keys
//! - `POST /flush` - Persist the metadata snapshot
//! - `GET /stats` - Namespace statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
