pub mod layer_config;
pub mod model_asset;
pub mod placement;

pub use layer_config::*;
pub use model_asset::*;
pub use placement::*;
