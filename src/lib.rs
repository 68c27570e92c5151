pub mod channel;
pub mod context;
pub mod errors;
pub mod filter;
pub mod params;
pub mod pipeline;
pub mod reader;
pub mod record;
pub mod rewrite;
pub mod sink;
pub mod types;
pub mod writer;

pub use pipeline::{run, RunSummary};
pub use reader::VariantReader;
pub use record::{Record, VariantRecord};
