//! UI side of the tip queue.

use crate::chat::ChatMessage;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::UnboundedReceiver;

/// Rate-limited, non-blocking reader of the tip queue.
///
/// At most one tip is held here. It stays held until the pet is free to
/// show it, so a tip arriving while a bubble is up is shown later rather
/// than dropped. Anything behind it waits in the channel.
#[derive(Debug)]
pub struct TipInbox {
    rx: Option<UnboundedReceiver<ChatMessage>>,
    pending: Option<ChatMessage>,
    poll_interval: Duration,
    last_poll: Option<Instant>,
}

impl TipInbox {
    pub fn new(rx: UnboundedReceiver<ChatMessage>, poll_interval: Duration) -> Self {
        Self {
            rx: Some(rx),
            pending: None,
            poll_interval,
            last_poll: None,
        }
    }

    /// An inbox with no producer behind it
    pub fn disconnected() -> Self {
        Self {
            rx: None,
            pending: None,
            poll_interval: Duration::MAX,
            last_poll: None,
        }
    }

    /// Look at the queue if a poll is due. Hands out the held tip only when
    /// `can_show` is true.
    pub fn poll(&mut self, now: Instant, can_show: bool) -> Option<ChatMessage> {
        if let Some(last) = self.last_poll {
            if now.saturating_duration_since(last) < self.poll_interval {
                return None;
            }
        }
        self.last_poll = Some(now);

        if self.pending.is_none() {
            self.pending = self.try_next();
        }
        if can_show {
            self.pending.take()
        } else {
            None
        }
    }

    /// Take the held tip, or the next queued one, right now
    pub fn take_pending(&mut self) -> Option<ChatMessage> {
        self.pending.take().or_else(|| self.try_next())
    }

    #[cfg(test)]
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    fn try_next(&mut self) -> Option<ChatMessage> {
        let rx = self.rx.as_mut()?;
        match rx.try_recv() {
            Ok(msg) => {
                tracing::debug!(text = %msg.text, "tip dequeued");
                Some(msg)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                tracing::info!("tip producer has gone away");
                self.rx = None;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tips::tip_queue;

    const POLL: Duration = Duration::from_secs(5);

    #[test]
    fn test_first_poll_is_immediate() {
        let (tx, rx) = tip_queue();
        let mut inbox = TipInbox::new(rx, POLL);
        tx.send(ChatMessage::tip("a", None, None)).unwrap();
        assert_eq!(inbox.poll(Instant::now(), true).unwrap().text, "a");
    }

    #[test]
    fn test_polls_are_rate_limited() {
        let (tx, rx) = tip_queue();
        let mut inbox = TipInbox::new(rx, POLL);
        let t0 = Instant::now();
        assert!(inbox.poll(t0, true).is_none());

        tx.send(ChatMessage::tip("a", None, None)).unwrap();
        assert!(inbox.poll(t0 + Duration::from_secs(1), true).is_none());
        assert!(inbox.poll(t0 + Duration::from_secs(5), true).is_some());
    }

    #[test]
    fn test_tip_held_while_busy_is_not_lost() {
        let (tx, rx) = tip_queue();
        let mut inbox = TipInbox::new(rx, POLL);
        let t0 = Instant::now();
        tx.send(ChatMessage::tip("first", None, None)).unwrap();
        tx.send(ChatMessage::tip("second", None, None)).unwrap();

        assert!(inbox.poll(t0, false).is_none());
        assert!(inbox.has_pending());
        assert!(inbox.poll(t0 + POLL, false).is_none());

        assert_eq!(inbox.poll(t0 + POLL * 2, true).unwrap().text, "first");
        assert_eq!(inbox.poll(t0 + POLL * 3, true).unwrap().text, "second");
    }

    #[test]
    fn test_take_pending_prefers_held_tip() {
        let (tx, rx) = tip_queue();
        let mut inbox = TipInbox::new(rx, POLL);
        tx.send(ChatMessage::tip("held", None, None)).unwrap();
        tx.send(ChatMessage::tip("queued", None, None)).unwrap();
        inbox.poll(Instant::now(), false);

        assert_eq!(inbox.take_pending().unwrap().text, "held");
        assert_eq!(inbox.take_pending().unwrap().text, "queued");
        assert!(inbox.take_pending().is_none());
    }

    #[test]
    fn test_dropped_producer_is_not_an_error() {
        let (tx, rx) = tip_queue();
        let mut inbox = TipInbox::new(rx, POLL);
        drop(tx);
        assert!(inbox.poll(Instant::now(), true).is_none());
        assert!(TipInbox::disconnected().poll(Instant::now(), true).is_none());
    }
}
