//! Web API for generating walking route sets.

pub mod api;
pub mod config;
pub mod fallback;
pub mod state;
