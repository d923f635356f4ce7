use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::models::chunk::PcmChunk;

/// Thread-safe FIFO of captured PCM chunks.
///
/// Shared as `Arc<CaptureBuffer>` between the capture worker (producer) and
/// the controller or host (consumer). All methods take `&self`; the queue and
/// its byte count are updated under one lock, so `total_bytes()` always equals
/// the sum of the queued chunk lengths.
///
/// With a byte limit set, overflow drops the oldest chunks. The chunk being
/// enqueued is always kept, even when it alone exceeds the limit.
#[derive(Debug, Default)]
pub struct CaptureBuffer {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    chunks: VecDeque<PcmChunk>,
    total_bytes: usize,
    limit: Option<usize>,
}

/// What an enqueue had to evict to stay under the limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Evicted {
    pub chunks: usize,
    pub bytes: usize,
}

impl Evicted {
    pub fn is_none(&self) -> bool {
        self.chunks == 0
    }
}

impl CaptureBuffer {
    /// Unbounded buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer that keeps at most `max_bytes` queued (see type docs).
    pub fn with_limit(max_bytes: usize) -> Self {
        let buffer = Self::new();
        buffer.set_limit(Some(max_bytes));
        buffer
    }

    /// Change the byte limit. Takes effect on the next enqueue.
    pub fn set_limit(&self, max_bytes: Option<usize>) {
        self.inner.lock().limit = max_bytes;
    }

    pub fn limit(&self) -> Option<usize> {
        self.inner.lock().limit
    }

    /// Append a chunk. Never blocks on the consumer beyond the queue lock.
    pub fn enqueue(&self, chunk: PcmChunk) -> Evicted {
        let mut inner = self.inner.lock();
        let mut evicted = Evicted::default();

        if let Some(limit) = inner.limit {
            while inner.total_bytes + chunk.len() > limit {
                let Some(oldest) = inner.chunks.pop_front() else {
                    break;
                };
                inner.total_bytes -= oldest.len();
                evicted.chunks += 1;
                evicted.bytes += oldest.len();
            }
        }

        inner.total_bytes += chunk.len();
        inner.chunks.push_back(chunk);
        evicted
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().chunks.is_empty()
    }

    /// Number of queued chunks.
    pub fn len(&self) -> usize {
        self.inner.lock().chunks.len()
    }

    /// Sum of the queued chunk lengths.
    pub fn total_bytes(&self) -> usize {
        self.inner.lock().total_bytes
    }

    /// Remove the oldest chunk, or return an empty chunk when nothing is queued.
    pub fn dequeue_one(&self) -> PcmChunk {
        let mut inner = self.inner.lock();
        match inner.chunks.pop_front() {
            Some(chunk) => {
                inner.total_bytes -= chunk.len();
                chunk
            }
            None => PcmChunk::empty(),
        }
    }

    /// Remove and return everything queued, oldest first.
    pub fn drain_all(&self) -> Vec<PcmChunk> {
        let mut inner = self.inner.lock();
        inner.total_bytes = 0;
        inner.chunks.drain(..).collect()
    }

    /// Drop everything queued.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.chunks.clear();
        inner.total_bytes = 0;
    }
}
