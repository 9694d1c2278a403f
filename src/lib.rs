//! Cement storefront backend: delivery quotes priced from road distance,
//! persisted orders with printable receipts, contact messages, card checkout
//! and an admin API over all of it.

pub mod api;
pub mod config;
pub mod database;
pub mod distance;
pub mod domain;
pub mod payment;
pub mod pricing;
pub mod receipt;
pub mod setup;
pub mod utils;
