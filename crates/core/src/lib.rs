//! Zona Gamer Core - Shared types library.
//!
//! This crate provides the domain vocabulary used by the storefront data layer:
//! - item slugs and the name-from-slug fallback
//! - platforms, account tiers, promotion types and user roles
//! - the four-tier price quad and currency formatting
//! - validated email addresses
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no document
//! store access, no HTTP clients. Everything here can be unit tested without a
//! runtime.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers and enums for the catalog domain

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
