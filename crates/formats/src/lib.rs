pub mod features;
pub mod geojson;

pub use features::*;
pub use geojson::*;
