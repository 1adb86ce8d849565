//! Storepanel Core - Shared types library.
//!
//! This crate provides the types shared by the Storepanel components:
//! - `client` - Form sessions for the product editor and the profile editor
//! - `cli` - Command-line front end driving those sessions
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. This keeps it
//! lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices and image paths

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
