//! Salescope: Property Sales Cleaning Library
//!
//! Loads property sales records, normalizes and enriches them into an
//! analysis-ready table, and reduces that table into the summary tables a
//! dashboarding tool consumes.

pub mod cli;
pub mod config;
pub mod pipeline;
pub mod report;
pub mod utils;
