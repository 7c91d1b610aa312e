pub mod camera;
pub mod components;
pub mod entity;
pub mod graph;
pub mod highlight;
pub mod picking;
pub mod spatial;

pub use graph::*;
