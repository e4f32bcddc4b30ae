//! Demand-gated bridge between a push-style socket and a pull-style consumer.
//!
//! A reader task owns the inbound half of the socket. Before each receive it
//! takes one unit of demand from a semaphore, so the socket is never read
//! further ahead than the consumer has asked for. Received items land in a
//! queue that the [`Subscription`] drains. Outbound frames go through a
//! separate writer task so that sends and receives never block each other.

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::fmt::Display;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::{mpsc, oneshot, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Demand {
    Unbounded,
    Max(usize),
}

pub struct Subscription<T, E> {
    rx: mpsc::UnboundedReceiver<Result<T, E>>,
    permits: Option<Arc<Semaphore>>,
    cancelled: Arc<AtomicBool>,
    reader: JoinHandle<()>,
}

/// Starts pulling from `source` on behalf of a single consumer.
pub fn subscribe<S, T, E>(source: S, demand: Demand) -> Subscription<T, E>
where
    S: Stream<Item = Result<T, E>> + Send + Unpin + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let permits = match demand {
        Demand::Unbounded => None,
        Demand::Max(count) => Some(Arc::new(Semaphore::new(count.min(Semaphore::MAX_PERMITS)))),
    };
    let cancelled = Arc::new(AtomicBool::new(false));
    let reader = tokio::spawn(reader_loop(source, tx, permits.clone(), cancelled.clone()));
    Subscription {
        rx,
        permits,
        cancelled,
        reader,
    }
}

async fn reader_loop<S, T, E>(
    mut source: S,
    tx: mpsc::UnboundedSender<Result<T, E>>,
    permits: Option<Arc<Semaphore>>,
    cancelled: Arc<AtomicBool>,
) where
    S: Stream<Item = Result<T, E>> + Unpin,
{
    loop {
        if let Some(permits) = &permits {
            match permits.acquire().await {
                Ok(permit) => permit.forget(),
                // closed by cancel()
                Err(_) => break,
            }
        }
        if cancelled.load(Ordering::Acquire) {
            break;
        }
        let Some(item) = source.next().await else {
            break;
        };
        // A receive that was already in flight when the consumer cancelled.
        if cancelled.load(Ordering::Acquire) {
            break;
        }
        let terminal = item.is_err();
        if tx.send(item).is_err() || terminal {
            break;
        }
    }
}

impl<T, E> Subscription<T, E> {
    /// Next delivered item. `None` once the source ends, after a terminal
    /// failure has been handed out, or after [`cancel`](Self::cancel).
    pub async fn next(&mut self) -> Option<Result<T, E>> {
        if self.is_cancelled() {
            return None;
        }
        self.rx.recv().await
    }

    /// Authorises `additional` more receives.
    pub fn request(&self, additional: usize) {
        let Some(permits) = &self.permits else {
            return;
        };
        if self.is_cancelled() {
            return;
        }
        let room = Semaphore::MAX_PERMITS.saturating_sub(permits.available_permits());
        permits.add_permits(additional.min(room));
    }

    /// Receives still authorised but not yet issued. `None` when unbounded.
    pub fn outstanding(&self) -> Option<usize> {
        self.permits
            .as_ref()
            .map(|permits| permits.available_permits())
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Stops issuing receives and drops everything already queued. A receive
    /// already in flight is left to finish; its result is discarded.
    pub fn cancel(&mut self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(permits) = &self.permits {
            permits.close();
        }
        self.rx.close();
        while self.rx.try_recv().is_ok() {}
        debug!(event = "deck_subscription_cancelled");
    }
}

impl<T, E> Drop for Subscription<T, E> {
    fn drop(&mut self) {
        self.cancel();
        // nobody can observe an in-flight receive any more; release the source
        self.reader.abort();
    }
}

pub type SendOutcome = Result<(), String>;

/// One serialised outbound envelope, labelled for logging.
#[derive(Debug)]
pub struct OutboundFrame {
    pub label: String,
    pub text: String,
    ack: Option<oneshot::Sender<SendOutcome>>,
}

#[derive(Debug, Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<OutboundFrame>,
}

impl Outbox {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OutboundFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queues a frame and returns a receiver that resolves once the writer
    /// has handed it to the socket (or failed to).
    pub fn send(&self, label: impl Into<String>, text: String) -> oneshot::Receiver<SendOutcome> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.enqueue(OutboundFrame {
            label: label.into(),
            text,
            ack: Some(ack_tx),
        });
        ack_rx
    }

    /// Fire-and-forget variant of [`send`](Self::send).
    pub fn push(&self, label: impl Into<String>, text: String) {
        self.enqueue(OutboundFrame {
            label: label.into(),
            text,
            ack: None,
        });
    }

    fn enqueue(&self, frame: OutboundFrame) {
        if let Err(err) = self.tx.send(frame) {
            let frame = err.0;
            warn!(event = "deck_send_dropped", command = %frame.label, reason = "writer_closed");
            if let Some(ack) = frame.ack {
                let _ = ack.send(Err("writer closed".to_string()));
            }
        }
    }
}

/// Drains `rx` into `sink`, wrapping each frame with `wrap`. Failures are
/// logged and acknowledged; the writer keeps going.
pub fn spawn_writer<Si, M, F>(
    sink: Si,
    rx: mpsc::UnboundedReceiver<OutboundFrame>,
    wrap: F,
) -> JoinHandle<()>
where
    Si: Sink<M> + Send + Unpin + 'static,
    Si::Error: Display,
    M: Send + 'static,
    F: Fn(String) -> M + Send + 'static,
{
    tokio::spawn(writer_loop(sink, rx, wrap))
}

async fn writer_loop<Si, M, F>(
    mut sink: Si,
    mut rx: mpsc::UnboundedReceiver<OutboundFrame>,
    wrap: F,
) where
    Si: Sink<M> + Unpin,
    Si::Error: Display,
    F: Fn(String) -> M,
{
    while let Some(frame) = rx.recv().await {
        let OutboundFrame { label, text, ack } = frame;
        let outcome = sink.send(wrap(text)).await.map_err(|err| err.to_string());
        match &outcome {
            Ok(()) => debug!(event = "deck_send_complete", command = %label),
            Err(err) => warn!(event = "deck_send_failed", command = %label, error = %err),
        }
        if let Some(ack) = ack {
            let _ = ack.send(outcome);
        }
    }
    let _ = sink.close().await;
}
