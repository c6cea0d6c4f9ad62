//! Database module for the SQLite publish sink.
//!
//! This module provides:
//! - Database initialization and migrations
//! - Lock wait configuration for sink connections
//! - The `Publisher` implementation writing ledger tables

pub mod migrations;
pub mod sink;

pub use migrations::init_db;
pub use sink::SqlitePublisher;
