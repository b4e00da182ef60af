pub mod config;
pub mod geometry_cache;
pub mod key;

pub use config::*;
pub use geometry_cache::*;
pub use key::*;
