//! # Perks API Library
//!
//! This library provides the core functionality for the Perks API service,
//! including handlers, models, and server configuration.

pub mod analytics;
pub mod auth;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod handlers;
pub mod media;
pub mod models;
pub mod notify;
pub mod pagination;
pub mod repositories;
pub mod scoring;
pub mod seeds;
pub mod seo;
pub mod server;
pub mod slug;
pub mod telemetry;
pub mod tracking;
pub use migration;
