//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

pub mod logging;
pub mod migration;
mod status;
pub mod transfer;

pub use logging::{EntryPoint, LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use status::{CurrencyTotal, StatusService, StatusSummary};
pub use transfer::{apply_delta, record_transfer, RecordedTransfer, TransferService};
