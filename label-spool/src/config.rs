//! Queue configuration

use std::time::Duration;

/// Retry behavior for chunk delivery
///
/// Consumed by [`crate::retry_with_backoff`]; the queue uses one instance per
/// chunk send.
#[derive(Debug, Clone)]
pub struct RetryOptions {
    /// Total attempt count, first try included
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each subsequent retry
    pub base_delay: Duration,
    /// Cap applied to the exponential delay
    pub max_delay: Duration,
    /// Add 0-20% random jitter to each delay
    pub jitter: bool,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            jitter: true,
        }
    }
}

/// Print queue configuration
///
/// All fields have working defaults; override with struct-update syntax:
///
/// ```
/// use label_spool::QueueConfig;
///
/// let config = QueueConfig {
///     cut_mode: true,
///     trailer: Some("CUT".to_string()),
///     ..QueueConfig::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Debounce window between an enqueue and the scheduled flush
    pub flush_delay: Duration,
    /// Maximum items pulled off the queue per batch
    pub batch_max: usize,
    /// Transport payload limit in bytes; batches are split to respect it
    pub max_payload_bytes: usize,
    /// Append the trailer once per qualifying batch
    pub cut_mode: bool,
    /// End-of-batch trailer, e.g. a device cut directive
    pub trailer: Option<String>,
    /// Separator between item contents within a chunk payload
    pub item_separator: String,
    /// Device copy-count command rewritten for [`crate::RepeatMode::CopyDirective`] jobs
    pub copy_command: String,
    /// Retry behavior for each chunk send
    pub retry: RetryOptions,
    /// Duplicate-suppression window for `enqueue_deduplicated`
    pub dedup_window: Duration,
    /// Hard cap on tracked fingerprints; oldest are evicted beyond this
    pub dedup_max_entries: usize,
    /// Dead-letter log entry cap
    pub dead_letter_max: usize,
    /// Dead-letter entries older than this are purged
    pub dead_letter_retention: Duration,
    /// Pass age after which `is_stuck()` reports true
    pub stuck_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            flush_delay: Duration::from_millis(500),
            batch_max: 120,
            max_payload_bytes: 4096,
            cut_mode: false,
            trailer: None,
            item_separator: "\n".to_string(),
            copy_command: "PRINT".to_string(),
            retry: RetryOptions::default(),
            dedup_window: Duration::from_millis(3000),
            dedup_max_entries: 512,
            dead_letter_max: 50,
            dead_letter_retention: Duration::from_secs(3600),
            stuck_timeout: Duration::from_secs(30),
        }
    }
}
