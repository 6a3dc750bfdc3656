//! Common types shared across the RTMS client crates.

#![warn(clippy::pedantic)]

/// Module for relay identifier newtypes
pub mod types;

/// Module for secret types that prevent accidental logging
pub mod secret;
