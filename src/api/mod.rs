//! Typed TaskFlow API calls.
//!
//! Each resource file adds its endpoints to `ApiClient`, so every call goes
//! through the same bearer/refresh handling in `client.rs`.

pub mod auth_api;
pub mod client;
pub mod jobs;
pub mod projects;
pub mod tasks;
pub mod uploads;

pub use client::{ApiClient, Attempt};
