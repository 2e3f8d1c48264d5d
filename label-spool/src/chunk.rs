//! Batch chunking and the trailer policy
//!
//! A batch is split into payload chunks at item boundaries only, so the
//! transport never sees half a label. The end-of-batch trailer fires hardware
//! side effects (a media cut), so it must appear exactly once per qualifying
//! batch, on the last chunk.

use crate::config::QueueConfig;
use crate::job::QueuedJob;

/// A contiguous slice of one batch whose serialized payload fits the
/// transport limit. Built fresh for every pass, never persisted.
#[derive(Debug, Clone)]
pub(crate) struct PayloadChunk {
    /// Composed printer-language payload for this chunk
    pub payload: String,
    /// Jobs whose content contributed to the payload, in order
    pub jobs: Vec<QueuedJob>,
    /// 0-based position within the batch, for diagnostics
    pub index: usize,
}

/// Whether this batch qualifies for the end-of-batch trailer.
///
/// Requires cut mode on, a configured trailer, more than one item, and no
/// item asking for trailer suppression (single-item "print now" jobs share
/// the queue but must not inherit multi-item behavior).
pub(crate) fn trailer_applies(batch: &[QueuedJob], config: &QueueConfig) -> bool {
    config.cut_mode
        && config.trailer.is_some()
        && batch.len() > 1
        && !batch.iter().any(|q| q.job.suppress_trailer)
}

/// Split a batch into payload chunks within `max_payload_bytes`.
///
/// An item whose rendered content alone exceeds the limit becomes its own
/// chunk regardless; the transport may reject it, which takes the normal
/// failure path. When the batch qualifies for the trailer, accumulation
/// reserves the trailer bytes so the final chunk honors the bound too.
pub(crate) fn build_chunks(batch: Vec<QueuedJob>, config: &QueueConfig) -> Vec<PayloadChunk> {
    let separator = config.item_separator.as_str();
    let with_trailer = trailer_applies(&batch, config);
    let reserve = if with_trailer {
        config
            .trailer
            .as_deref()
            .map(|t| t.len() + separator.len())
            .unwrap_or(0)
    } else {
        0
    };
    let limit = config.max_payload_bytes.saturating_sub(reserve);

    let mut chunks: Vec<PayloadChunk> = Vec::new();
    let mut payload = String::new();
    let mut jobs: Vec<QueuedJob> = Vec::new();

    for queued in batch {
        let rendered = queued.job.rendered(&config.copy_command, separator);
        let added = if payload.is_empty() {
            rendered.len()
        } else {
            rendered.len() + separator.len()
        };

        if !payload.is_empty() && payload.len() + added > limit {
            chunks.push(PayloadChunk {
                payload: std::mem::take(&mut payload),
                jobs: std::mem::take(&mut jobs),
                index: chunks.len(),
            });
        }

        if !payload.is_empty() {
            payload.push_str(separator);
        }
        payload.push_str(&rendered);
        jobs.push(queued);
    }

    if !payload.is_empty() {
        chunks.push(PayloadChunk {
            payload,
            jobs,
            index: chunks.len(),
        });
    }

    if with_trailer {
        if let (Some(last), Some(trailer)) = (chunks.last_mut(), config.trailer.as_deref()) {
            last.payload.push_str(separator);
            last.payload.push_str(trailer);
        }
    }

    chunks
}
