//! API Module
//!
//! HTTP handlers and routing for the cache server.
//!
//! # Endpoints
//! - `POST /put` - Store a key-value pair
//! - `GET /get?key=` - Retrieve a value by key

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
