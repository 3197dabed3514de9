//! # In-memory bounded event log.
//!
//! [`MemoryLog`] is a ring buffer with named cursors. It backs tests and
//! single-process setups where producer and consumers share an address space.
//!
//! ## Rules
//! - **Bounded capacity**: the ring keeps only the most recent `capacity` events.
//! - **Sequences start at 1**: `0` means "nothing appended" / "nothing consumed".
//! - **Lag handling**: a cursor that points at evicted entries is moved forward to
//!   the oldest retained event on its next `consume`; the skipped events are gone.
//! - **Close**: after [`MemoryLog::close`] every operation fails with [`LogError::Closed`].

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{EventLog, Reader, ReaderRef};
use crate::{error::LogError, events::Event};

struct Inner {
    capacity: usize,
    entries: VecDeque<Event>,
    next_seq: u64,
    /// reader name → last consumed sequence
    cursors: HashMap<String, u64>,
    closed: bool,
}

impl Inner {
    fn ensure_open(&self) -> Result<(), LogError> {
        if self.closed {
            Err(LogError::Closed)
        } else {
            Ok(())
        }
    }

    fn first_seq(&self) -> Option<u64> {
        self.entries.front().map(|e| e.seq)
    }

    /// Index of the first retained entry with `seq > after`.
    fn index_after(&self, after: u64) -> usize {
        match self.first_seq() {
            Some(first) => {
                let offset = after.saturating_add(1).saturating_sub(first);
                usize::try_from(offset)
                    .unwrap_or(usize::MAX)
                    .min(self.entries.len())
            }
            None => 0,
        }
    }
}

/// Bounded ring-buffer event log.
///
/// Cheap to clone (internally holds an `Arc`).
#[derive(Clone)]
pub struct MemoryLog {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryLog {
    /// Creates a new log holding at most `capacity` events (minimum 1, clamped).
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                capacity: capacity.max(1),
                entries: VecDeque::new(),
                next_seq: 1,
                cursors: HashMap::new(),
                closed: false,
            })),
        }
    }

    /// Maximum number of retained events.
    pub async fn capacity(&self) -> usize {
        self.inner.lock().await.capacity
    }

    /// Number of currently retained events.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    /// True if nothing is retained.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.entries.is_empty()
    }

    /// Closes the log; subsequent operations fail with [`LogError::Closed`].
    pub async fn close(&self) {
        self.inner.lock().await.closed = true;
    }
}

impl Default for MemoryLog {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl EventLog for MemoryLog {
    async fn append(&self, mut event: Event) -> Result<u64, LogError> {
        let mut inner = self.inner.lock().await;
        inner.ensure_open()?;

        let seq = inner.next_seq;
        inner.next_seq += 1;
        event.seq = seq;
        inner.entries.push_back(event);

        while inner.entries.len() > inner.capacity {
            inner.entries.pop_front();
        }
        Ok(seq)
    }

    async fn create_reader(&self, name: &str) -> Result<ReaderRef, LogError> {
        let mut inner = self.inner.lock().await;
        inner.ensure_open()?;

        if !inner.cursors.contains_key(name) {
            let start = match inner.first_seq() {
                Some(first) => first - 1,
                None => inner.next_seq - 1,
            };
            inner.cursors.insert(name.to_string(), start);
        }
        Ok(Arc::new(MemoryReader {
            name: Arc::from(name),
            inner: Arc::clone(&self.inner),
        }))
    }

    async fn latest_sequence(&self) -> Result<u64, LogError> {
        let inner = self.inner.lock().await;
        inner.ensure_open()?;
        Ok(inner.next_seq - 1)
    }
}

/// Cursor over a [`MemoryLog`].
///
/// Readers created under the same name share one cursor.
pub struct MemoryReader {
    name: Arc<str>,
    inner: Arc<Mutex<Inner>>,
}

#[async_trait]
impl Reader for MemoryReader {
    fn name(&self) -> &str {
        &self.name
    }

    async fn consume(&self, max: usize) -> Result<Vec<Event>, LogError> {
        let mut inner = self.inner.lock().await;
        inner.ensure_open()?;

        let cursor = inner.cursors.get(&*self.name).copied().unwrap_or(0);
        let start = inner.index_after(cursor);
        let batch: Vec<Event> = inner.entries.iter().skip(start).take(max).cloned().collect();

        if let Some(last) = batch.last() {
            let seq = last.seq;
            inner.cursors.insert(self.name.to_string(), seq);
        }
        Ok(batch)
    }

    async fn lookback(&self, count: usize, from: u64) -> Result<Vec<Event>, LogError> {
        let inner = self.inner.lock().await;
        inner.ensure_open()?;

        let end = inner.index_after(from);
        let start = end.saturating_sub(count);
        Ok(inner.entries.range(start..end).cloned().collect())
    }
}
