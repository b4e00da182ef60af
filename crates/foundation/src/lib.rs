pub mod bounds;
pub mod math;
pub mod mesh;

// Foundation crate: small, well-tested primitives only.
pub use bounds::*;
pub use mesh::*;
