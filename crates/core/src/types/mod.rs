//! Core types for Storepanel.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod image;
pub mod price;

pub use id::*;
pub use image::ImagePath;
pub use price::{CurrencyCode, Price, PriceError};
