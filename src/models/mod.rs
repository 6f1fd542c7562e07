//! # Data Models
//!
//! SeaORM entities for the listings store.

pub mod building;
pub mod unit;

pub use building::Entity as Building;
pub use unit::Entity as Unit;
