//! Simply Online Core - Shared types library.
//!
//! This crate provides the domain types used across the order sync workspace:
//! - `sync` - Webhook ingestion, historical backfill and order lookup service
//! - `cli` - Command-line tools for migrations and manual backfills
//!
//! # Architecture
//!
//! The core crate contains only types and parsing rules - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, amounts, emails, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
