//! DNS flood detection and reactive mitigation.
//!
//! DNS requests are aggregated per base domain in fixed windows. Each closed
//! window is compared against the domain's trailing baseline, and sources
//! behind a flood are banned and dropped at the network edge through an SDN
//! controller.

pub mod api;
pub mod config;
pub mod core;
pub mod models;
pub mod utils;
