//! Core types for Zona Gamer.
//!
//! This module provides type-safe wrappers for the catalog domain.

pub mod email;
pub mod id;
pub mod price;
pub mod status;
pub mod text;

pub use email::{Email, EmailError};
pub use id::*;
pub use price::{Currency, PriceQuad};
pub use status::*;
pub use text::fold_for_compare;
