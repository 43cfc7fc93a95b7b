pub mod compose;
pub mod export;
pub mod flatten;
pub mod metadata;
pub mod migrate;
pub mod pipeline;
pub mod references;

pub use compose::*;
pub use export::*;
pub use flatten::*;
pub use metadata::*;
pub use migrate::*;
pub use pipeline::{SchemaPipeline, SchemaSnapshot};
pub use references::*;
