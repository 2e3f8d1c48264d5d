//! Print queue core
//!
//! Accepts label jobs, coalesces them into size-bounded batches behind a
//! debounce window, splits batches into payload chunks, sends chunks
//! strictly in order through the retry helper, and quarantines chunks whose
//! retries are exhausted in the dead-letter log.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, Notify};
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::chunk::{self, PayloadChunk};
use crate::config::QueueConfig;
use crate::dead_letter::{DeadLetterEntry, DeadLetterLog};
use crate::error::TransportError;
use crate::fingerprint::fingerprint;
use crate::job::{PrintJob, QueuedJob};
use crate::retry::retry_with_backoff;
use crate::transport::Transport;

/// Pause between chunk sends so a long batch does not starve other tasks.
const INTER_CHUNK_DELAY: Duration = Duration::from_millis(25);

/// Synchronous callback invoked whenever a chunk is dead-lettered, with the
/// undelivered jobs and the terminal error. Used for host-side alerting.
pub type DeadLetterCallback = Arc<dyn Fn(&[PrintJob], &TransportError) + Send + Sync>;

/// Queue counters, for health endpoints and polling UIs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub pending: usize,
    pub enqueued_total: u64,
    pub delivered_total: u64,
    pub duplicates_suppressed: u64,
    pub dead_lettered_chunks: u64,
}

struct QueueState {
    /// FIFO job buffer; enqueue appends, the pass drains from the front
    pending: VecDeque<QueuedJob>,
    /// Deadline of the scheduled flush; overwriting it is the debounce
    flush_deadline: Option<Instant>,
    /// True while a processing pass is active
    running: bool,
    processing_started_at: Option<Instant>,
    /// fingerprint -> suppression expiry
    recent_fingerprints: HashMap<String, Instant>,
    dead_letters: DeadLetterLog,
    enqueued_total: u64,
    delivered_total: u64,
    duplicates_suppressed: u64,
    dead_lettered_chunks: u64,
}

struct Inner {
    config: QueueConfig,
    transport: Arc<dyn Transport>,
    state: Mutex<QueueState>,
    wake: Notify,
    shutdown: CancellationToken,
    next_job_id: AtomicU64,
    on_dead_letter: Option<DeadLetterCallback>,
}

/// Reliable label print-job delivery queue.
///
/// An explicit value, cheaply cloneable; construct one per physical printer
/// with its transport and configuration. Must be created inside a tokio
/// runtime, which hosts the background flush worker.
#[derive(Clone)]
pub struct PrintQueue {
    inner: Arc<Inner>,
}

impl PrintQueue {
    /// Create a queue with default configuration.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_config(transport, QueueConfig::default())
    }

    /// Create a queue with explicit configuration.
    pub fn with_config(transport: Arc<dyn Transport>, config: QueueConfig) -> Self {
        Self::build(transport, config, None)
    }

    /// Create a queue that invokes `callback` whenever a chunk is
    /// dead-lettered.
    pub fn with_dead_letter_callback(
        transport: Arc<dyn Transport>,
        config: QueueConfig,
        callback: DeadLetterCallback,
    ) -> Self {
        Self::build(transport, config, Some(callback))
    }

    fn build(
        transport: Arc<dyn Transport>,
        config: QueueConfig,
        on_dead_letter: Option<DeadLetterCallback>,
    ) -> Self {
        let dead_letters = DeadLetterLog::new(config.dead_letter_max, config.dead_letter_retention);
        let inner = Arc::new(Inner {
            config,
            transport,
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                flush_deadline: None,
                running: false,
                processing_started_at: None,
                recent_fingerprints: HashMap::new(),
                dead_letters,
                enqueued_total: 0,
                delivered_total: 0,
                duplicates_suppressed: 0,
                dead_lettered_chunks: 0,
            }),
            wake: Notify::new(),
            shutdown: CancellationToken::new(),
            next_job_id: AtomicU64::new(0),
            on_dead_letter,
        });

        tokio::spawn(flush_worker(Arc::clone(&inner)));

        Self { inner }
    }

    /// Append a job and schedule a debounced flush.
    ///
    /// Rapid bursts keep replacing the flush deadline, so they coalesce into
    /// a single pass.
    pub async fn enqueue(&self, job: PrintJob) {
        self.push_jobs(vec![job], self.inner.config.flush_delay).await;
    }

    /// Append a job with single-item semantics: the trailer is suppressed
    /// regardless of what else is queued, and the flush runs without delay.
    pub async fn enqueue_immediate(&self, mut job: PrintJob) {
        job.suppress_trailer = true;
        self.push_jobs(vec![job], Duration::ZERO).await;
    }

    /// Append several jobs and schedule an immediate flush.
    pub async fn enqueue_many(&self, jobs: Vec<PrintJob>) {
        if jobs.is_empty() {
            return;
        }
        self.push_jobs(jobs, Duration::ZERO).await;
    }

    /// Append a job unless an identical `(content, quantity)` submission was
    /// accepted within the suppression window. Suppression is a logged no-op,
    /// not an error.
    pub async fn enqueue_deduplicated(&self, job: PrintJob) {
        let fp = fingerprint(&job.content, job.quantity);

        {
            let mut st = self.inner.state.lock().await;
            let now = Instant::now();
            st.recent_fingerprints.retain(|_, expiry| *expiry > now);

            if st.recent_fingerprints.contains_key(&fp) {
                st.duplicates_suppressed += 1;
                debug!(fingerprint = %fp, "Duplicate submission suppressed");
                return;
            }

            let expiry = now + self.inner.config.dedup_window;
            st.recent_fingerprints.insert(fp, expiry);
            if st.recent_fingerprints.len() > self.inner.config.dedup_max_entries {
                evict_oldest_fingerprints(
                    &mut st.recent_fingerprints,
                    self.inner.config.dedup_max_entries,
                );
            }
        }

        self.push_jobs(vec![job], self.inner.config.flush_delay).await;
    }

    /// Cancel any pending flush timer and, if no pass is running and the
    /// queue is non-empty, run a processing pass to completion.
    pub async fn flush_now(&self) {
        {
            let mut st = self.inner.state.lock().await;
            st.flush_deadline = None;
            if st.pending.is_empty() {
                return;
            }
        }
        self.inner.run_pass().await;
    }

    /// Number of jobs still waiting in the queue.
    pub async fn size(&self) -> usize {
        self.inner.state.lock().await.pending.len()
    }

    /// Discard all pending jobs without sending them. Operator cancellation,
    /// not a failure path; returns the number of jobs dropped.
    pub async fn clear(&self) -> usize {
        let mut st = self.inner.state.lock().await;
        let dropped = st.pending.len();
        st.pending.clear();
        st.flush_deadline = None;
        if dropped > 0 {
            info!(dropped, "Pending jobs cleared by operator");
        }
        dropped
    }

    /// Snapshot of permanently failed chunks, expired entries purged.
    pub async fn get_dead_letter_log(&self) -> Vec<DeadLetterEntry> {
        let mut st = self.inner.state.lock().await;
        st.dead_letters.cleanup();
        st.dead_letters.snapshot()
    }

    pub async fn clear_dead_letter_log(&self) {
        self.inner.state.lock().await.dead_letters.clear();
    }

    /// True if a pass has been running longer than the stuck timeout without
    /// completing. For periodic health checks; the queue never resets itself
    /// mid-pass.
    pub async fn is_stuck(&self) -> bool {
        let st = self.inner.state.lock().await;
        is_stuck_state(&st, self.inner.config.stuck_timeout)
    }

    /// Operator escape hatch for a stuck pass: clears the running flag and
    /// cancels any pending flush timer.
    pub async fn force_reset(&self) {
        let mut st = self.inner.state.lock().await;
        if st.running {
            warn!("Force-resetting print queue pass state");
        }
        st.running = false;
        st.processing_started_at = None;
        st.flush_deadline = None;
    }

    /// Cumulative counters plus the current pending size.
    pub async fn stats(&self) -> QueueStats {
        let st = self.inner.state.lock().await;
        QueueStats {
            pending: st.pending.len(),
            enqueued_total: st.enqueued_total,
            delivered_total: st.delivered_total,
            duplicates_suppressed: st.duplicates_suppressed,
            dead_lettered_chunks: st.dead_lettered_chunks,
        }
    }

    /// Stop the background flush worker and drain pending jobs with a final
    /// flush.
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();
        self.flush_now().await;
    }

    async fn push_jobs(&self, jobs: Vec<PrintJob>, delay: Duration) {
        {
            let mut st = self.inner.state.lock().await;
            for job in jobs {
                let id = self.inner.next_job_id.fetch_add(1, Ordering::Relaxed);
                st.pending.push_back(QueuedJob { id, job });
                st.enqueued_total += 1;
            }
            // Cancel-and-replace: the latest enqueue owns the deadline
            st.flush_deadline = Some(Instant::now() + delay);
        }
        self.inner.wake.notify_one();
    }
}

impl Inner {
    /// One processing pass: drain `pending` in batch slices, chunk each
    /// batch, send chunks sequentially, dead-letter chunks whose retries are
    /// exhausted. Failure is contained at chunk granularity; the pass always
    /// continues to the next chunk and clears `running` on every exit path.
    #[instrument(skip(self), name = "print_pass")]
    async fn run_pass(&self) {
        {
            let mut st = self.state.lock().await;
            if st.running {
                if is_stuck_state(&st, self.config.stuck_timeout) {
                    warn!("Previous pass exceeded the stuck timeout, taking over");
                } else {
                    debug!("Pass already running, skipping");
                    return;
                }
            }
            st.running = true;
            st.processing_started_at = Some(Instant::now());
        }

        // Per-pass delivery bookkeeping, keyed by internal job id
        let mut sent: HashSet<u64> = HashSet::new();

        loop {
            let batch: Vec<QueuedJob> = {
                let mut st = self.state.lock().await;
                let take = st.pending.len().min(self.config.batch_max);
                st.pending.drain(..take).collect()
            };
            if batch.is_empty() {
                break;
            }

            debug!(batch_len = batch.len(), "Processing batch");
            let chunks = chunk::build_chunks(batch, &self.config);
            let chunk_count = chunks.len();

            for chunk in &chunks {
                if chunk.jobs.iter().all(|q| sent.contains(&q.id)) {
                    debug!(chunk = chunk.index, "Chunk already delivered, skipping");
                    continue;
                }

                self.send_chunk(chunk, &mut sent).await;

                if chunk.index + 1 < chunk_count {
                    // Yield so chunked bursts do not starve the host
                    tokio::time::sleep(INTER_CHUNK_DELAY).await;
                }
            }
        }

        let mut st = self.state.lock().await;
        st.running = false;
        st.processing_started_at = None;
    }

    /// Deliver one chunk through the retry helper; dead-letter on exhaustion.
    async fn send_chunk(&self, chunk: &PayloadChunk, sent: &mut HashSet<u64>) {
        let transport = Arc::clone(&self.transport);
        let payload = chunk.payload.clone();

        let result = retry_with_backoff(
            "chunk_send",
            &self.config.retry,
            TransportError::is_retryable,
            || {
                let transport = Arc::clone(&transport);
                let payload = payload.clone();
                async move { transport.send(&payload).await }
            },
        )
        .await;

        match result {
            Ok(()) => {
                for q in &chunk.jobs {
                    sent.insert(q.id);
                }
                let mut st = self.state.lock().await;
                st.delivered_total += chunk.jobs.len() as u64;
                info!(
                    chunk = chunk.index,
                    jobs = chunk.jobs.len(),
                    bytes = chunk.payload.len(),
                    "Chunk delivered"
                );
            }
            Err(error) => {
                let unsent: Vec<PrintJob> = chunk
                    .jobs
                    .iter()
                    .filter(|q| !sent.contains(&q.id))
                    .map(|q| q.job.clone())
                    .collect();

                warn!(
                    chunk = chunk.index,
                    jobs = unsent.len(),
                    error = %error,
                    "Chunk delivery exhausted, dead-lettering"
                );

                {
                    let mut st = self.state.lock().await;
                    st.dead_letters.record(unsent.clone(), error.clone());
                    st.dead_lettered_chunks += 1;
                }

                if let Some(callback) = &self.on_dead_letter {
                    callback(&unsent, &error);
                }
            }
        }
    }
}

/// Background worker: waits for the debounce deadline and runs passes.
/// On shutdown it drains whatever is still pending.
async fn flush_worker(inner: Arc<Inner>) {
    debug!("Flush worker started");

    loop {
        let deadline = { inner.state.lock().await.flush_deadline };
        let sleep_until = deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));

        tokio::select! {
            _ = inner.shutdown.cancelled() => {
                let has_pending = { !inner.state.lock().await.pending.is_empty() };
                if has_pending {
                    info!("Draining pending jobs before shutdown");
                    inner.run_pass().await;
                }
                break;
            }

            _ = inner.wake.notified() => {}

            _ = tokio::time::sleep_until(sleep_until), if deadline.is_some() => {
                { inner.state.lock().await.flush_deadline = None; }
                inner.run_pass().await;
            }
        }
    }

    debug!("Flush worker stopped");
}

fn is_stuck_state(st: &QueueState, timeout: Duration) -> bool {
    st.running
        && st
            .processing_started_at
            .map(|started| started.elapsed() > timeout)
            .unwrap_or(false)
}

/// Evict oldest-expiring fingerprints until the map fits the cap.
fn evict_oldest_fingerprints(map: &mut HashMap<String, Instant>, cap: usize) {
    let excess = map.len().saturating_sub(cap);
    if excess == 0 {
        return;
    }

    let mut by_expiry: Vec<(String, Instant)> =
        map.iter().map(|(k, v)| (k.clone(), *v)).collect();
    by_expiry.sort_by_key(|(_, expiry)| *expiry);

    for (key, _) in by_expiry.into_iter().take(excess) {
        map.remove(&key);
    }
}
