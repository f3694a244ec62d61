pub mod cache;
pub mod io;

pub use cache::*;
pub use io::*;
