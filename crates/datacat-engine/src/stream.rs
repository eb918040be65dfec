//! Record streams: bounded point-to-point conduits between two stages.
//!
//! Dropping the [`RecordSender`] closes the stream. The consumer still
//! receives every record sent before the close, then `recv` yields `None`.
//!
//! A consumer that goes away early closes the stream for the producer, whose
//! next `send` fails with [`StageError::DownstreamClosed`]. For a shared
//! stream this also ends the stream for the other consumers.

use std::sync::Arc;

use datacat_types::{Record, StageError};
use tokio::sync::{mpsc, watch, Mutex};

/// Create a stream holding at most `capacity` in-flight records.
///
/// A producer's `send` waits while the stream is full, which rate-matches
/// adjacent stages.
#[must_use]
pub fn channel(capacity: usize) -> (RecordSender, RecordStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        RecordSender { tx, sent: 0 },
        RecordStream {
            rx: Receiver::Exclusive(rx),
            received: 0,
        },
    )
}

/// Producing end of a stream.
#[derive(Debug)]
pub struct RecordSender {
    tx: mpsc::Sender<Record>,
    sent: u64,
}

impl RecordSender {
    /// Hand one record to the consumer, waiting until there is room.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::DownstreamClosed`] if every consumer has gone.
    pub async fn send(&mut self, record: Record) -> Result<(), StageError> {
        self.tx
            .send(record)
            .await
            .map_err(|_| StageError::DownstreamClosed)?;
        self.sent += 1;
        Ok(())
    }

    /// Records delivered so far.
    #[must_use]
    pub fn sent(&self) -> u64 {
        self.sent
    }
}

#[derive(Debug)]
enum Receiver {
    Exclusive(mpsc::Receiver<Record>),
    Shared(SharedHandle),
}

/// State common to every handle of a shared stream.
#[derive(Debug)]
struct SharedReceiver {
    rx: Mutex<mpsc::Receiver<Record>>,
    closed: watch::Sender<bool>,
}

impl SharedReceiver {
    /// Stop accepting records and wake every handle waiting in `recv`.
    fn close(&self) {
        self.closed.send_replace(true);
        // A handle blocked in `recv` holds the lock; it closes the receiver
        // itself once it sees the flag.
        if let Ok(mut rx) = self.rx.try_lock() {
            rx.close();
        }
    }

    async fn recv(&self) -> Option<Record> {
        let mut closed = self.closed.subscribe();
        let mut rx = self.rx.lock().await;
        if *closed.borrow_and_update() {
            rx.close();
            return None;
        }
        tokio::select! {
            record = rx.recv() => record,
            _ = closed.changed() => {
                rx.close();
                None
            }
        }
    }
}

/// One consumer's handle on a shared stream. Dropping it before the stream
/// ended closes the stream for everyone.
#[derive(Debug)]
struct SharedHandle {
    inner: Arc<SharedReceiver>,
    exhausted: bool,
}

impl SharedHandle {
    fn new(inner: Arc<SharedReceiver>) -> Self {
        Self {
            inner,
            exhausted: false,
        }
    }

    /// Give up this handle without closing the stream.
    fn detach(mut self) -> Arc<SharedReceiver> {
        self.exhausted = true;
        Arc::clone(&self.inner)
    }
}

impl Drop for SharedHandle {
    fn drop(&mut self) {
        if !self.exhausted {
            self.inner.close();
        }
    }
}

/// Consuming end of a stream.
#[derive(Debug)]
pub struct RecordStream {
    rx: Receiver,
    received: u64,
}

impl RecordStream {
    /// Receive the next record, or `None` once the producer has closed the
    /// stream and every buffered record has been drained.
    pub async fn recv(&mut self) -> Option<Record> {
        let record = match &mut self.rx {
            Receiver::Exclusive(rx) => rx.recv().await,
            Receiver::Shared(handle) => {
                let record = handle.inner.recv().await;
                handle.exhausted = record.is_none();
                record
            }
        };
        if record.is_some() {
            self.received += 1;
        }
        record
    }

    /// Records received through this handle.
    #[must_use]
    pub fn received(&self) -> u64 {
        self.received
    }

    /// Stop consuming. The producer's next `send` fails and, for a shared
    /// stream, every other handle sees the end of the stream.
    pub fn close(&mut self) {
        match &mut self.rx {
            Receiver::Exclusive(rx) => rx.close(),
            Receiver::Shared(handle) => handle.inner.close(),
        }
    }

    /// Split this stream into `consumers` competing handles.
    ///
    /// Each record is delivered to exactly one handle; which one is
    /// unspecified. The stream closes for all handles together, including
    /// when one handle is closed or dropped before the end.
    #[must_use]
    pub fn share(self, consumers: usize) -> Vec<RecordStream> {
        let shared = match self.rx {
            Receiver::Exclusive(rx) => Arc::new(SharedReceiver {
                rx: Mutex::new(rx),
                closed: watch::Sender::new(false),
            }),
            Receiver::Shared(handle) => handle.detach(),
        };
        (0..consumers.max(1))
            .map(|_| RecordStream {
                rx: Receiver::Shared(SharedHandle::new(Arc::clone(&shared))),
                received: 0,
            })
            .collect()
    }
}
