pub mod diagnostics;
pub mod error;
pub mod extract;
pub mod matcher;
pub mod pipeline;
pub mod sanitize;
pub mod scanner;
pub mod schema;
pub mod transform;
pub mod types;

pub use error::ProcessError;
pub use pipeline::{process, process_with_sink, FailureSink, NullFailureSink, TracingFailureSink};
pub use sanitize::sanitize;
pub use schema::{SchemaMetadata, TargetSchema};
pub use types::{ProcessingResult, RequestContext, SanitizerConfig, StrategyResult};
