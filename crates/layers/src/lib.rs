pub mod borders;
pub mod diagnostics;
pub mod holes;
pub mod lod;
pub mod mesh;
pub mod options;
pub mod projection;
pub mod rings;
pub mod style;
pub mod territories;
pub mod validate;

pub use borders::*;
pub use diagnostics::*;
pub use lod::*;
pub use options::*;
pub use style::*;
pub use territories::*;
