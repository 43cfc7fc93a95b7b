pub mod catalog;
pub mod http;
pub mod memory;
pub mod traits;
pub mod xlsx;

pub use catalog::*;
pub use http::*;
pub use memory::*;
pub use traits::*;
