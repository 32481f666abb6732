//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for accounts and file metadata
//! - An in-memory map for the AccountStore port

pub mod duckdb;
pub mod memory;
