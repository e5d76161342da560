//! Ember Core - Foundational types for the Ember particle kernel
//!
//! This crate provides the types shared by the kernel and its hosts:
//! - `Vec3`, `Color` - Spatial and color values
//! - Error types and Result alias

mod error;
mod types;

pub use error::{EmberError, Result};
pub use types::{Color, Vec3};
