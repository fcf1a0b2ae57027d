//! API Routes
//!
//! Route handlers organized by functionality.

pub mod events;
pub mod graph;
pub mod health;
pub mod records;
