//! Route handlers for the HTTP API.

pub mod delete;
pub mod health;
pub mod stream;
pub mod upload;
pub mod videos;
