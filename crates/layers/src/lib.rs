pub mod assemble;
pub mod decor;
pub mod extrude;
pub mod labels;
pub mod layer;
pub mod symbology;

pub use assemble::*;
pub use extrude::*;
pub use layer::*;
pub use symbology::*;
