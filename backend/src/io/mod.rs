//! # IO Module
//!
//! Adapter layer between HTTP clients and the domain logic.
//!
//! ## Key Responsibilities
//!
//! - **API Endpoints**: REST endpoints for the web frontend
//! - **Live Updates**: Server-Sent Events for the period summary
//! - **Data Serialization**: Converting between JSON DTOs and domain objects
//! - **Error Translation**: Converting domain errors to HTTP status codes
//!
//! ## Design Patterns
//!
//! - **Handler Pattern**: Separate handler functions for each endpoint
//! - **Dependency Injection**: Services injected via Axum state
//! - **Mappers**: Dedicated DTO/domain conversions in `rest::mappers`

pub mod rest;

pub use rest::*;
