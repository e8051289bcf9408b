pub mod analytics;
pub mod registry;
pub mod sequencing;
pub mod status;

pub use analytics::AnalyticsCalculator;
pub use registry::QueueRegistry;
pub use sequencing::{OrderingPolicy, SequencingEngine, TieredFifoPolicy};
pub use status::StatusReporter;
