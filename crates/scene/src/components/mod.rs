pub mod bounds;
pub mod material;
pub mod mesh;
pub mod properties;
pub mod visibility;

pub use bounds::*;
pub use material::*;
pub use mesh::*;
pub use properties::*;
pub use visibility::*;
