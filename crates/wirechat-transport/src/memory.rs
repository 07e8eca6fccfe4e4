use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use url::Url;

use crate::error::{Result, TransportError};
use crate::traits::{Connector, Generation, Transport};

/// In-process connector that records everything sent through it.
///
/// Nothing is delivered anywhere: the owner of the session feeds
/// [`crate::TransportEvent`]s in by hand. Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    shared: Arc<Mutex<Record>>,
}

#[derive(Debug, Default)]
struct Record {
    opened: Vec<(Url, Generation)>,
    sent: Vec<(Generation, Bytes)>,
    closed: Vec<Generation>,
    refuse_open: bool,
    fail_sends: bool,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `(url, generation)` passed to `open`, in order.
    pub fn opened(&self) -> Vec<(Url, Generation)> {
        self.record().opened.clone()
    }

    /// Every payload sent on any handle, in order.
    pub fn sent(&self) -> Vec<Bytes> {
        self.record().sent.iter().map(|(_, b)| b.clone()).collect()
    }

    /// Payloads sent on handles of one generation.
    pub fn sent_on(&self, generation: Generation) -> Vec<Bytes> {
        self.record()
            .sent
            .iter()
            .filter(|(g, _)| *g == generation)
            .map(|(_, b)| b.clone())
            .collect()
    }

    /// Drain the sent log.
    pub fn take_sent(&self) -> Vec<Bytes> {
        std::mem::take(&mut self.record().sent)
            .into_iter()
            .map(|(_, b)| b)
            .collect()
    }

    /// Generations whose handle was closed.
    pub fn closed(&self) -> Vec<Generation> {
        self.record().closed.clone()
    }

    /// Make subsequent `open` calls fail.
    pub fn set_refuse_open(&self, refuse: bool) {
        self.record().refuse_open = refuse;
    }

    /// Make subsequent sends fail with [`TransportError::Closed`].
    pub fn set_fail_sends(&self, fail: bool) {
        self.record().fail_sends = fail;
    }

    fn record(&self) -> MutexGuard<'_, Record> {
        self.shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Connector for MemoryConnector {
    type Handle = MemoryHandle;

    fn open(&mut self, url: &Url, generation: Generation) -> Result<MemoryHandle> {
        let mut record = self.record();
        if record.refuse_open {
            return Err(TransportError::Connect {
                url: url.to_string(),
                message: "connection refused".to_string(),
            });
        }
        record.opened.push((url.clone(), generation));
        Ok(MemoryHandle {
            generation,
            closed: false,
            shared: Arc::clone(&self.shared),
        })
    }
}

/// Handle returned by [`MemoryConnector`].
#[derive(Debug)]
pub struct MemoryHandle {
    generation: Generation,
    closed: bool,
    shared: Arc<Mutex<Record>>,
}

impl MemoryHandle {
    pub fn generation(&self) -> Generation {
        self.generation
    }

    fn record(&self) -> MutexGuard<'_, Record> {
        self.shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Transport for MemoryHandle {
    fn send(&mut self, payload: Bytes) -> Result<()> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        let generation = self.generation;
        let mut record = self.record();
        if record.fail_sends {
            return Err(TransportError::Closed);
        }
        record.sent.push((generation, payload));
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.closed = true;
        let generation = self.generation;
        self.record().closed.push(generation);
        Ok(())
    }
}
