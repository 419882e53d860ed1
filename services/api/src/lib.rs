//! services/api/src/lib.rs
//!
//! Library surface of the API service so that the binaries and the
//! integration tests share the same adapters, pipeline, and router.

pub mod adapters;
pub mod ai;
pub mod config;
pub mod error;
pub mod web;
