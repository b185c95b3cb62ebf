//! Concurrent request processing
//!
//! The stores are already safe to share across threads, so the only extra
//! piece the async pipeline needs is a processor that fans a batch out over
//! tokio tasks.
//!
//! - **BatchProcessor**: partitions a batch by calling account and runs the
//!   partitions concurrently, each in file order

pub mod batch_processor;

pub use batch_processor::{BatchProcessor, ProcessingResult};
