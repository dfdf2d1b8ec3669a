//! Data Models
//!
//! Contains all data structures used throughout the application.

pub mod failure;
pub mod fix;
pub mod platform;
pub mod refinement;
pub mod scenario;

pub use failure::*;
pub use fix::*;
pub use platform::*;
pub use refinement::*;
pub use scenario::*;
