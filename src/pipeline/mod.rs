//! Pipeline module - the cleaning stages and the reductions over their output

pub mod aggregate;
pub mod clean;
pub mod error;
pub mod features;
pub mod loader;
pub mod missing;
pub mod normalize;
pub mod schema;

pub use aggregate::*;
pub use clean::*;
pub use error::*;
pub use features::*;
pub use loader::*;
pub use missing::*;
pub use normalize::*;
pub use schema::*;
