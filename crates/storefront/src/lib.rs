//! Zona Gamer Storefront library.
//!
//! Data layer of the Zona Gamer storefront: catalog listings and their cache,
//! inventory administration, search, the audit log, roles, authentication,
//! the cart and the WhatsApp delivery composer. [`state::AppState`] wires
//! everything together.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cache;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod storage;
pub mod tasks;
