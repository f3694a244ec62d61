pub mod factory;
pub mod host;
pub mod layer;
pub mod model3d;
pub mod projection;

pub use factory::*;
pub use host::*;
pub use layer::*;
pub use model3d::*;
pub use projection::*;
