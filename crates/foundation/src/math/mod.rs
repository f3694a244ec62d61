pub mod mat4;
pub mod mercator;
pub mod vec;

pub use mat4::*;
pub use mercator::*;
pub use vec::*;
