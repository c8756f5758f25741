//! Database seeding functionality
//!
//! This module provides functionality to seed the database with initial
//! data. It covers the singleton settings rows the service expects to find
//! on every read.

pub mod settings;

pub use settings::seed_settings;
