//! Request and Response models for the storage HTTP API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{validate_key, SetRequest, UpdateRequest, MAX_KEY_LENGTH};
pub use responses::{
    DeleteResponse, ErrorResponse, FlushResponse, GetResponse, HealthResponse, KeysResponse,
    SetResponse, StatsResponse,
};
