//! Library exports for taskflow-client, shared between the binary and tests.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod startup;
pub mod state;
pub mod store;
pub mod utils;
