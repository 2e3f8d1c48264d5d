//! # label-spool
//!
//! Reliable delivery queue for label print jobs - batching, chunking, retry
//! and dead-lettering only.
//!
//! ## Scope
//!
//! This crate handles HOW rendered label content reaches a printer:
//! - Debounced batching of enqueued jobs
//! - Payload-limit chunk splitting at item boundaries
//! - End-of-batch trailer policy (one cut per logical batch)
//! - Exponential-backoff retry behind a typed retryability taxonomy
//! - Bounded, time-boxed dead-letter log for exhausted chunks
//! - Raw TCP (port 9100) network transport
//!
//! Business logic (WHAT to print) stays in application code: the label
//! renderer composes the printer-language content before enqueueing.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use label_spool::{NetworkTransport, PrintJob, PrintQueue, QueueConfig};
//!
//! let transport = Arc::new(NetworkTransport::new("192.168.1.100", 9100)?);
//! let queue = PrintQueue::with_config(transport, QueueConfig {
//!     cut_mode: true,
//!     trailer: Some("CUT".to_string()),
//!     ..QueueConfig::default()
//! });
//!
//! queue.enqueue(PrintJob::new("SIZE 40,30\nTEXT 10,10,\"0\",0,1,1,\"Oolong 500ml\"\nPRINT 1,1")).await;
//! queue.flush_now().await;
//! ```

mod chunk;
mod config;
mod dead_letter;
mod error;
mod fingerprint;
mod job;
mod queue;
mod retry;
mod transport;

// Re-exports
pub use config::{QueueConfig, RetryOptions};
pub use dead_letter::DeadLetterEntry;
pub use error::{TransportError, TransportResult};
pub use fingerprint::fingerprint;
pub use job::{PrintJob, RepeatMode};
pub use queue::{DeadLetterCallback, PrintQueue, QueueStats};
pub use retry::retry_with_backoff;
pub use transport::{NetworkTransport, Transport};
