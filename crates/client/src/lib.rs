//! Dataset server API client.
//!
//! This crate is the wire contract with the dataset server: save the edited
//! table, delete an uploaded table, pick the forecast source, retrain.
//!
//! Blocking, no retries. The engine's `Persistence` trait is implemented
//! here so an `EditSession` can save straight through it.

mod client;

pub use client::{ActionResponse, ApiClient, ClientError, DEFAULT_TIMEOUT};
