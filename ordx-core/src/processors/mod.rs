//! Processors that read and write the ledger.
//!
//! - [`ingestor::EventIngestor`] applies blocks of events.
//! - [`location_tracker::LocationTracker`] and
//!   [`count_aggregator::CountAggregator`] rebuild the derived tables.
//! - [`block_sync::BlockSyncRunner`] follows an upstream block source.
//! - [`scanner::BlockScanner`] replays a block range for scan jobs.

pub mod block_sync;
pub mod count_aggregator;
pub mod ingestor;
pub mod location_tracker;
pub mod scanner;

pub use block_sync::{BlockSource, BlockSyncRunner, HttpBlockSource, MemoryBlockSource};
pub use count_aggregator::CountAggregator;
pub use ingestor::{ApplyMode, EventIngestor};
pub use location_tracker::LocationTracker;
pub use scanner::BlockScanner;
