pub mod controller;
pub mod session;
pub mod source;

pub use controller::*;
pub use session::*;
pub use source::*;
