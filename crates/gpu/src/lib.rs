pub mod context;
pub mod headless;
pub mod renderer;
pub mod session;
pub mod shaders;

pub use context::*;
pub use renderer::*;
pub use session::*;
pub use shaders::*;
