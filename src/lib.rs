//! # Listings Library
//!
//! Building and unit storage for a real-estate listings service, plus the
//! CSV import that geocodes new buildings and creates missing units.

pub mod config;
pub mod db;
pub mod error;
pub mod geocoding;
pub mod import;
pub mod models;
pub mod repositories;
pub mod telemetry;
pub use migration;
