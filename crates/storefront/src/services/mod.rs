//! Business logic services for the storefront data layer.
//!
//! # Services
//!
//! - `catalog` - Game and combo listings with their TTL cache
//! - `inventory` - Item and email-account administration
//! - `search` - Account lookup by customer phone or account email
//! - `reports` - Audit log of generated messages
//! - `roles` - User roles and access flags
//! - `auth` - Sign-in, sign-up and the session date
//! - `cart` - Persisted shopping cart
//! - `currency` - Display currency preference
//! - `whatsapp` - Delivery message composer

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod currency;
pub mod inventory;
pub mod legacy;
pub mod reports;
pub mod roles;
pub mod search;
pub mod whatsapp;
