//! Dreamwear API
//!
//! Asynchronous job-orchestration layer for AI clothing try-on generation:
//! accepts an image-transformation request, delegates the transformation to
//! the upstream Replicate prediction service, and exposes status polling to
//! the client through a persistent job record.

pub mod app_state;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
