//! Bounded envelope queues
//!
//! One queue per direction, each a single-producer/single-consumer FIFO. The
//! endpoints are deliberately not `Clone`.

use crate::error::{AudioTaskError, Result};
use crate::protocol::Envelope;
use crossbeam_channel::{
    bounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender, TryRecvError, TrySendError,
};
use std::time::Duration;

/// Default number of envelopes each queue holds
pub const DEFAULT_CAPACITY: usize = 10;

/// Producing end of an envelope queue
#[derive(Debug)]
pub struct EnvelopeSender {
    tx: Sender<Envelope>,
}

/// Consuming end of an envelope queue
#[derive(Debug)]
pub struct EnvelopeReceiver {
    rx: Receiver<Envelope>,
}

/// Create a bounded envelope queue
///
/// A capacity of zero would turn the queue into a rendezvous point, which the
/// decode thread cannot work with, so it is rejected.
pub fn envelope_channel(capacity: usize) -> Result<(EnvelopeSender, EnvelopeReceiver)> {
    if capacity == 0 {
        return Err(AudioTaskError::invalid_config(
            "queue capacity must be at least 1",
        ));
    }
    let (tx, rx) = bounded(capacity);
    Ok((EnvelopeSender { tx }, EnvelopeReceiver { rx }))
}

impl EnvelopeSender {
    /// Enqueue, waiting as long as needed for a free slot
    pub fn send(&self, envelope: Envelope) -> Result<()> {
        self.tx
            .send(envelope)
            .map_err(|_| AudioTaskError::Disconnected)
    }

    /// Enqueue, waiting at most `timeout` for a free slot
    pub fn send_timeout(&self, envelope: Envelope, timeout: Duration) -> Result<()> {
        self.tx
            .send_timeout(envelope, timeout)
            .map_err(|err| match err {
                SendTimeoutError::Timeout(envelope) => {
                    AudioTaskError::ChannelFull(Box::new(envelope))
                }
                SendTimeoutError::Disconnected(_) => AudioTaskError::Disconnected,
            })
    }

    /// Enqueue without waiting; a full queue hands the envelope back
    pub fn try_send(&self, envelope: Envelope) -> Result<()> {
        self.tx.try_send(envelope).map_err(|err| match err {
            TrySendError::Full(envelope) => AudioTaskError::ChannelFull(Box::new(envelope)),
            TrySendError::Disconnected(_) => AudioTaskError::Disconnected,
        })
    }

    /// Envelopes currently queued
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    /// Maximum number of queued envelopes
    pub fn capacity(&self) -> usize {
        self.tx.capacity().unwrap_or(DEFAULT_CAPACITY)
    }
}

impl EnvelopeReceiver {
    /// Dequeue, waiting as long as needed
    pub fn recv(&self) -> Result<Envelope> {
        self.rx.recv().map_err(|_| AudioTaskError::Disconnected)
    }

    /// Dequeue, waiting at most `timeout`
    ///
    /// `Ok(None)` means the timeout elapsed with nothing queued.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<Envelope>> {
        match self.rx.recv_timeout(timeout) {
            Ok(envelope) => Ok(Some(envelope)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(AudioTaskError::Disconnected),
        }
    }

    /// Dequeue without waiting
    pub fn try_recv(&self) -> Result<Option<Envelope>> {
        match self.rx.try_recv() {
            Ok(envelope) => Ok(Some(envelope)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(AudioTaskError::Disconnected),
        }
    }

    /// Envelopes currently queued
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub(crate) fn inner(&self) -> &Receiver<Envelope> {
        &self.rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::CommandKind;

    fn request(seq: u32) -> Envelope {
        Envelope::request(CommandKind::IsRunning, seq)
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(
            envelope_channel(0),
            Err(AudioTaskError::InvalidConfig(_))
        ));
    }

    #[test]
    fn eleventh_envelope_is_refused_not_dropped() {
        let (tx, rx) = envelope_channel(DEFAULT_CAPACITY).unwrap();
        assert_eq!(tx.capacity(), 10);
        for seq in 0..10 {
            tx.try_send(request(seq)).unwrap();
        }
        assert_eq!(tx.len(), tx.capacity());

        match tx.try_send(request(10)) {
            Err(AudioTaskError::ChannelFull(envelope)) => assert_eq!(envelope.seq, 10),
            other => panic!("expected ChannelFull, got {:?}", other),
        }

        // Queue contents untouched and still in order
        let drained: Vec<u32> = std::iter::from_fn(|| rx.try_recv().unwrap())
            .map(|envelope| envelope.seq)
            .collect();
        assert_eq!(drained, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn send_timeout_reports_full_queue() {
        let (tx, _rx) = envelope_channel(1).unwrap();
        tx.send(request(0)).unwrap();
        let result = tx.send_timeout(request(1), Duration::from_millis(5));
        assert!(matches!(result, Err(AudioTaskError::ChannelFull(_))));
    }

    #[test]
    fn recv_timeout_returns_none_when_idle() {
        let (_tx, rx) = envelope_channel(2).unwrap();
        assert!(rx.recv_timeout(Duration::from_millis(1)).unwrap().is_none());
    }

    #[test]
    fn dropped_sender_disconnects_receiver() {
        let (tx, rx) = envelope_channel(2).unwrap();
        drop(tx);
        assert!(matches!(
            rx.recv_timeout(Duration::from_millis(1)),
            Err(AudioTaskError::Disconnected)
        ));
    }
}
