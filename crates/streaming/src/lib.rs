pub mod navigation;
pub mod request;

pub use navigation::*;
pub use request::*;
