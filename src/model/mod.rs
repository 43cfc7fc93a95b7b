pub mod migration;
pub mod ordering;
pub mod properties;
pub mod schema;
pub mod tab;
pub mod template;
pub mod workbook;

pub use migration::*;
pub use ordering::*;
pub use properties::*;
pub use schema::*;
pub use tab::*;
pub use template::*;
pub use workbook::*;
