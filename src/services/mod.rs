pub mod backfill;
pub mod cursor;
pub mod ingestion;
pub mod page;
pub mod progress;

pub use backfill::{BackfillService, BackfillSummary};
pub use ingestion::{IngestSummary, IngestWindow, IngestionService};
