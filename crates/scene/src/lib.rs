pub mod border_index;
pub mod picking;
pub mod spatial;

pub use border_index::*;
pub use picking::*;
