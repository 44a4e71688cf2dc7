//! Report module - run summary and flat-file export

pub mod export;
pub mod summary;

pub use export::*;
pub use summary::*;
